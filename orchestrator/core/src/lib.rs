// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! In-process app host: declare the resources of a distributed application,
//! track their lifecycle states, allocate their endpoints and export the
//! whole graph as a deployment manifest.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
