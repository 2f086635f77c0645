// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Model
//!
//! Registry of every [`Resource`] in the application, in declaration order.
//! Resource names are unique; a duplicate is rejected before the run phase
//! can start.

use crate::domain::resource::Resource;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("A resource named '{0}' is already registered")]
    DuplicateResourceName(String),

    #[error("Invalid resource name '{name}': {reason}")]
    InvalidResourceName { name: String, reason: String },

    #[error("Resource '{resource}' already declares an endpoint named '{endpoint}'")]
    DuplicateEndpointName { resource: String, endpoint: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationModel {
    app_host_directory: PathBuf,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl ApplicationModel {
    pub fn new(app_host_directory: impl Into<PathBuf>) -> Self {
        Self {
            app_host_directory: app_host_directory.into(),
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Directory relative source paths are resolved against.
    pub fn app_host_directory(&self) -> &Path {
        &self.app_host_directory
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<&mut Resource, ModelError> {
        if self.index.contains_key(resource.name()) {
            return Err(ModelError::DuplicateResourceName(resource.name().to_string()));
        }

        let position = self.resources.len();
        self.index.insert(resource.name().to_string(), position);
        self.resources.push(resource);

        tracing::debug!(
            resource = %self.resources[position].name(),
            kind = %self.resources[position].kind(),
            "Resource registered"
        );
        Ok(&mut self.resources[position])
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.index.get(name).map(|&position| &self.resources[position])
    }

    pub fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        let position = *self.index.get(name)?;
        Some(&mut self.resources[position])
    }

    pub fn require(&self, name: &str) -> Result<&Resource, ModelError> {
        self.resource(name)
            .ok_or_else(|| ModelError::ResourceNotFound(name.to_string()))
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceKind;

    #[test]
    fn test_duplicate_name_rejected() {
        let mut model = ApplicationModel::new("/app");
        model
            .add_resource(Resource::new("cache", ResourceKind::Container).unwrap())
            .unwrap();

        let err = model
            .add_resource(Resource::new("cache", ResourceKind::Executable).unwrap())
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateResourceName("cache".to_string()));
        assert_eq!(model.len(), 1);
        assert_eq!(model.resource("cache").unwrap().kind(), &ResourceKind::Container);
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let mut model = ApplicationModel::new("/app");
        for name in ["web", "api", "db"] {
            model
                .add_resource(Resource::new(name, ResourceKind::Project).unwrap())
                .unwrap();
        }

        let names: Vec<&str> = model.resources().map(Resource::name).collect();
        assert_eq!(names, vec!["web", "api", "db"]);
        assert!(matches!(model.require("queue"), Err(ModelError::ResourceNotFound(_))));
    }
}
