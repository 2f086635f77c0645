// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Resource model, endpoint declarations, lifecycle states and the per-kind
//! manifest entry writers.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types shared by the configuration, run and publish phases

pub mod annotation;
pub mod app_config;
pub mod app_definition;
pub mod callbacks;
pub mod container;
pub mod endpoint;
pub mod lifecycle;
pub mod manifest;
pub mod manifest_path;
pub mod model;
pub mod parameter;
pub mod resource;
pub mod value;
