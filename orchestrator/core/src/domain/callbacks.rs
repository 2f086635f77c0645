// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Environment and command-line callbacks.
//!
//! Callbacks are evaluated lazily, once per consumer (the manifest engine in
//! publish mode, the launcher in run mode), always in insertion order into a
//! shared accumulator.

use crate::domain::value::ManifestValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Whether the model is being run locally or exported as a manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    #[default]
    Run,
    Publish,
}

impl ExecutionContext {
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Publish)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub struct EnvironmentCallbackContext<'a> {
    pub execution_context: ExecutionContext,
    pub resource_name: &'a str,
    environment: BTreeMap<String, ManifestValue>,
}

impl<'a> EnvironmentCallbackContext<'a> {
    pub fn new(resource_name: &'a str, execution_context: ExecutionContext) -> Self {
        Self {
            execution_context,
            resource_name,
            environment: BTreeMap::new(),
        }
    }

    /// Set `key`, replacing any value an earlier callback wrote.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ManifestValue>) {
        self.environment.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ManifestValue> {
        self.environment.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ManifestValue> {
        self.environment.remove(key)
    }

    pub fn environment(&self) -> &BTreeMap<String, ManifestValue> {
        &self.environment
    }

    pub fn into_environment(self) -> BTreeMap<String, ManifestValue> {
        self.environment
    }
}

pub type EnvironmentCallback =
    Arc<dyn Fn(&mut EnvironmentCallbackContext<'_>) -> Result<(), CallbackError> + Send + Sync>;

#[derive(Clone)]
pub struct EnvironmentCallbackAnnotation {
    callback: EnvironmentCallback,
}

impl EnvironmentCallbackAnnotation {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut EnvironmentCallbackContext<'_>) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Callback that always writes one fixed entry.
    pub fn from_pair(key: impl Into<String>, value: impl Into<ManifestValue>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(move |context| {
            context.set(key.clone(), value.clone());
            Ok(())
        })
    }

    pub fn invoke(
        &self,
        context: &mut EnvironmentCallbackContext<'_>,
    ) -> Result<(), CallbackError> {
        (self.callback)(context)
    }
}

impl fmt::Debug for EnvironmentCallbackAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentCallbackAnnotation").finish_non_exhaustive()
    }
}

pub struct CommandLineArgsCallbackContext<'a> {
    pub execution_context: ExecutionContext,
    pub resource_name: &'a str,
    args: Vec<ManifestValue>,
}

impl<'a> CommandLineArgsCallbackContext<'a> {
    pub fn new(resource_name: &'a str, execution_context: ExecutionContext) -> Self {
        Self {
            execution_context,
            resource_name,
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, arg: impl Into<ManifestValue>) {
        self.args.push(arg.into());
    }

    pub fn args(&self) -> &[ManifestValue] {
        &self.args
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    pub fn into_args(self) -> Vec<ManifestValue> {
        self.args
    }
}

pub type CommandLineArgsCallback =
    Arc<dyn Fn(&mut CommandLineArgsCallbackContext<'_>) -> Result<(), CallbackError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandLineArgsCallbackAnnotation {
    callback: CommandLineArgsCallback,
}

impl CommandLineArgsCallbackAnnotation {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut CommandLineArgsCallbackContext<'_>) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Callback that appends a fixed list of arguments.
    pub fn from_args(args: Vec<ManifestValue>) -> Self {
        Self::new(move |context| {
            for arg in &args {
                context.push(arg.clone());
            }
            Ok(())
        })
    }

    pub fn invoke(
        &self,
        context: &mut CommandLineArgsCallbackContext<'_>,
    ) -> Result<(), CallbackError> {
        (self.callback)(context)
    }
}

impl fmt::Debug for CommandLineArgsCallbackAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLineArgsCallbackAnnotation").finish_non_exhaustive()
    }
}
