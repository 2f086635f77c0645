// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource lifecycle states and wait errors.
//!
//! State names are an open domain: the well-known names below are what the
//! process/container supervisors publish today, but any string is a valid
//! state and is matched by exact comparison only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    pub const STARTING: &'static str = "Starting";
    pub const RUNNING: &'static str = "Running";
    pub const FAILED_TO_START: &'static str = "FailedToStart";
    pub const FINISHED: &'static str = "Finished";
    pub const EXITED: &'static str = "Exited";
    pub const STOPPING: &'static str = "Stopping";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// States after which the supervisor will not publish again on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::FAILED_TO_START | Self::FINISHED | Self::EXITED
        )
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&String> for StateName {
    fn from(name: &String) -> Self {
        Self(name.clone())
    }
}

impl AsRef<str> for StateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of one resource as held by the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStateSnapshot {
    pub resource_name: String,
    pub state: StateName,
    /// Strictly increasing per resource, starting at 1
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Published on the event bus for every accepted state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStateChanged {
    pub snapshot: ResourceStateSnapshot,
    pub previous: Option<StateName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("Wait for resource '{resource}' was cancelled")]
    Cancelled { resource: String },

    #[error("No state was ever published for resource '{resource}'")]
    UnknownResource { resource: String },

    #[error("Wait for resource '{resource}' requires at least one target state")]
    EmptyTargetSet { resource: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Notification service is shut down; state '{state}' for '{resource}' not published")]
    ShutDown { resource: String, state: StateName },
}
