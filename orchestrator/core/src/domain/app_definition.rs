// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application definition file schema.
//!
//! Declarative equivalent of a builder program, in the same Kubernetes-style
//! envelope as the app host configuration.

use crate::domain::endpoint::Protocol;
use crate::domain::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

pub const APP_DEFINITION_API_VERSION: &str = "apphost/v1";
pub const APP_DEFINITION_KIND: &str = "Application";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDefinition {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: DefinitionMetadata,

    #[serde(default)]
    pub spec: AppDefinitionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppDefinitionSpec {
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
}

/// One resource. Which fields apply depends on `type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub name: String,

    /// `container`, `executable`, `project`, `parameter`, `connectionString`
    /// or a custom manifest type such as `azure.bicep.v0`
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,

    /// Literal default of a parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Values are kept as JSON so unsupported types surface when publishing
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<EndpointDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bind_mounts: Vec<BindMountDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeDefinition>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Resources whose connection string is injected as `ConnectionStrings__<name>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_from_manifest: bool,
}

impl ResourceDefinition {
    pub fn kind(&self) -> ResourceKind {
        match self.resource_type.as_str() {
            "container" => ResourceKind::Container,
            "executable" => ResourceKind::Executable,
            "project" => ResourceKind::Project,
            "parameter" => ResourceKind::Parameter,
            "connectionString" => ResourceKind::ConnectionString,
            custom => ResourceKind::Custom(custom.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDefinition {
    pub name: String,

    pub scheme: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_port: Option<u16>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,

    /// Environment variable receiving the allocated port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindMountDefinition {
    pub source: PathBuf,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinition {
    pub context: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,
}

impl AppDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if self.api_version != APP_DEFINITION_API_VERSION {
            return Err(format!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version, APP_DEFINITION_API_VERSION
            ));
        }

        if self.kind != APP_DEFINITION_KIND {
            return Err(format!(
                "Invalid kind: '{}'. Must be '{}'",
                self.kind, APP_DEFINITION_KIND
            ));
        }

        if self.metadata.name.is_empty() {
            return Err("metadata.name cannot be empty".to_string());
        }

        let mut seen = HashSet::new();
        for resource in &self.spec.resources {
            if !seen.insert(resource.name.as_str()) {
                return Err(format!("Duplicate resource name: '{}'", resource.name));
            }

            match resource.kind() {
                ResourceKind::Container if resource.image.is_none() && resource.build.is_none() => {
                    return Err(format!(
                        "Container '{}' needs an image or a build section",
                        resource.name
                    ));
                }
                ResourceKind::Executable if resource.command.is_none() => {
                    return Err(format!("Executable '{}' needs a command", resource.name));
                }
                ResourceKind::Project if resource.path.is_none() => {
                    return Err(format!("Project '{}' needs a path", resource.name));
                }
                ResourceKind::ConnectionString if resource.connection_string.is_none() => {
                    return Err(format!(
                        "Connection string '{}' needs a connectionString value",
                        resource.name
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(resources: Vec<ResourceDefinition>) -> AppDefinition {
        AppDefinition {
            api_version: APP_DEFINITION_API_VERSION.to_string(),
            kind: APP_DEFINITION_KIND.to_string(),
            metadata: DefinitionMetadata {
                name: "shop".to_string(),
                labels: None,
            },
            spec: AppDefinitionSpec { resources },
        }
    }

    #[test]
    fn test_kind_mapping() {
        let mut resource = ResourceDefinition {
            name: "db".to_string(),
            resource_type: "connectionString".to_string(),
            ..Default::default()
        };
        assert_eq!(resource.kind(), ResourceKind::ConnectionString);
        resource.resource_type = "azure.bicep.v0".to_string();
        assert_eq!(resource.kind(), ResourceKind::Custom("azure.bicep.v0".to_string()));
    }

    #[test]
    fn test_container_requires_image_or_build() {
        let container = ResourceDefinition {
            name: "web".to_string(),
            resource_type: "container".to_string(),
            ..Default::default()
        };
        let err = definition(vec![container]).validate().unwrap_err();
        assert!(err.contains("needs an image"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let param = ResourceDefinition {
            name: "key".to_string(),
            resource_type: "parameter".to_string(),
            ..Default::default()
        };
        let err = definition(vec![param.clone(), param]).validate().unwrap_err();
        assert!(err.contains("Duplicate resource name"));
    }
}
