// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application Definition YAML Parser
//!
//! Parses application definition files into domain objects and replays them
//! onto an [`ApplicationBuilder`], so a YAML file and a builder program
//! describing the same application produce the same model.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external YAML → Domain objects
//! - **Anti-Corruption:** Translates YAML schema to builder calls
//!
//! # Definition Format
//!
//! ```yaml
//! apiVersion: apphost/v1
//! kind: Application
//! metadata:
//!   name: shop
//! spec:
//!   resources:
//!     - name: cache
//!       type: container
//!       image: redis:7
//!       endpoints:
//!         - name: tcp
//!           scheme: redis
//!           containerPort: 6379
//!     - name: api
//!       type: project
//!       path: src/api
//!       references: [cache]
//!       endpoints:
//!         - name: http
//!           scheme: http
//!           env: PORT
//! ```

use crate::application::builder::ApplicationBuilder;
use crate::domain::app_definition::{AppDefinition, ResourceDefinition};
use crate::domain::endpoint::EndpointAnnotation;
use crate::domain::parameter::InputDefault;
use crate::domain::resource::ResourceKind;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub struct AppDefinitionParser;

impl AppDefinitionParser {
    /// Parse application definition from YAML string
    pub fn parse_yaml(yaml: &str) -> Result<AppDefinition> {
        let definition: AppDefinition = serde_yaml::from_str(yaml)
            .context("Failed to parse YAML application definition")?;

        definition
            .validate()
            .map_err(|e| anyhow!("Application definition validation failed: {}", e))?;

        Ok(definition)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<AppDefinition> {
        let yaml = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read application definition: {:?}", path.as_ref())
        })?;

        Self::parse_yaml(&yaml)
    }

    pub fn to_yaml(definition: &AppDefinition) -> Result<String> {
        serde_yaml::to_string(definition).context("Failed to serialize application definition")
    }

    /// Load a definition file into a builder anchored at the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ApplicationBuilder> {
        let path = path.as_ref();
        let definition = Self::parse_file(path)?;

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Current directory is unavailable")?
                .join(path)
        };
        let app_host_directory = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Self::into_builder(&definition, app_host_directory)
    }

    /// Replay every resource of `definition` onto a fresh builder.
    pub fn into_builder(
        definition: &AppDefinition,
        app_host_directory: impl Into<PathBuf>,
    ) -> Result<ApplicationBuilder> {
        let mut builder = ApplicationBuilder::new(app_host_directory);
        for resource in &definition.spec.resources {
            apply_resource(&mut builder, resource)
                .with_context(|| format!("Invalid resource '{}'", resource.name))?;
        }

        tracing::info!(
            application = %definition.metadata.name,
            resources = definition.spec.resources.len(),
            "Application definition loaded"
        );
        Ok(builder)
    }
}

fn apply_resource(builder: &mut ApplicationBuilder, resource: &ResourceDefinition) -> Result<()> {
    let name = resource.name.as_str();
    let mut target = match resource.kind() {
        ResourceKind::Container => {
            // Images built from a Dockerfile are tagged with the resource name
            let image = resource.image.as_deref().unwrap_or(name);
            builder.add_container(name, image)?
        }
        ResourceKind::Executable => {
            let command = resource
                .command
                .as_deref()
                .ok_or_else(|| anyhow!("executable needs a command"))?;
            let working_directory = resource
                .working_directory
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            builder.add_executable(name, command, working_directory, resource.args.iter().cloned())?
        }
        ResourceKind::Project => {
            let path = resource
                .path
                .as_deref()
                .ok_or_else(|| anyhow!("project needs a path"))?;
            builder.add_project(name, path)?
        }
        ResourceKind::Parameter => match &resource.default {
            Some(default) => builder.add_parameter_with_default(
                name,
                resource.secret,
                InputDefault::Value(default.clone()),
            )?,
            None => builder.add_parameter(name, resource.secret)?,
        },
        ResourceKind::ConnectionString => {
            let value = resource
                .connection_string
                .clone()
                .ok_or_else(|| anyhow!("connection string resource needs a value"))?;
            builder.add_connection_string(name, value)?
        }
        kind @ ResourceKind::Custom(_) => builder.add_resource(name, kind)?,
    };

    // Executables receive their args at declaration
    if !matches!(resource.kind(), ResourceKind::Executable) && !resource.args.is_empty() {
        target = target.with_args(resource.args.iter().cloned());
    }

    if let Some(entrypoint) = &resource.entrypoint {
        target = target.with_entrypoint(entrypoint.clone());
    }

    if let Some(build) = &resource.build {
        target = target.with_dockerfile(&build.context, build.dockerfile.as_deref());
    }

    if !matches!(resource.kind(), ResourceKind::ConnectionString) {
        if let Some(connection_string) = &resource.connection_string {
            target = target.with_connection_string(connection_string.clone());
        }
    }

    for endpoint in &resource.endpoints {
        target = target.with_endpoint(endpoint_annotation(endpoint))?;
    }

    for mount in &resource.bind_mounts {
        target = target.with_bind_mount(&mount.source, mount.target.clone(), mount.read_only);
    }

    for volume in &resource.volumes {
        target =
            target.with_volume(volume.name.as_deref(), volume.target.clone(), volume.read_only);
    }

    for (key, value) in &resource.env {
        target = target.with_environment(key.clone(), value.clone());
    }

    for source in &resource.references {
        target = target.with_connection_string_reference(source);
    }

    for (key, value) in &resource.build_args {
        target = target.with_build_arg(key.clone(), value.clone());
    }

    for (key, value) in &resource.metadata {
        target = target.with_metadata(key.clone(), value.clone());
    }

    if resource.exclude_from_manifest {
        target.exclude_from_manifest();
    }

    Ok(())
}

fn endpoint_annotation(
    definition: &crate::domain::app_definition::EndpointDefinition,
) -> EndpointAnnotation {
    let mut endpoint = EndpointAnnotation::new(definition.name.clone(), definition.scheme.clone());
    if let Some(protocol) = definition.protocol {
        endpoint = endpoint.with_protocol(protocol);
    }
    if let Some(transport) = &definition.transport {
        endpoint = endpoint.with_transport(transport.clone());
    }
    if let Some(port) = definition.port {
        endpoint = endpoint.with_port(port);
    }
    if let Some(container_port) = definition.container_port {
        endpoint = endpoint.with_container_port(container_port);
    }
    if definition.external {
        endpoint = endpoint.external();
    }
    if let Some(variable) = &definition.env {
        endpoint = endpoint.with_environment_variable(variable.clone());
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::Protocol;

    #[test]
    fn test_parse_minimal_definition() {
        let yaml = r#"
apiVersion: apphost/v1
kind: Application
metadata:
  name: empty
"#;
        let definition = AppDefinitionParser::parse_yaml(yaml).unwrap();
        assert_eq!(definition.metadata.name, "empty");
        assert!(definition.spec.resources.is_empty());
    }

    #[test]
    fn test_validate_api_version() {
        let yaml = r#"
apiVersion: invalid/v1
kind: Application
metadata:
  name: shop
"#;
        let result = AppDefinitionParser::parse_yaml(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid apiVersion"));
    }

    #[test]
    fn test_endpoints_and_mounts_are_applied() {
        let yaml = r#"
apiVersion: apphost/v1
kind: Application
metadata:
  name: shop
spec:
  resources:
    - name: dns
      type: container
      image: coredns/coredns:1.11
      bindMounts:
        - source: config
          target: /etc/coredns
          readOnly: true
      volumes:
        - target: /cache
      endpoints:
        - name: dns
          scheme: dns
          protocol: udp
          containerPort: 53
          external: true
"#;
        let definition = AppDefinitionParser::parse_yaml(yaml).unwrap();
        let model = AppDefinitionParser::into_builder(&definition, "/srv/shop")
            .unwrap()
            .build();

        let dns = model.resource("dns").unwrap();
        let endpoint = dns.endpoint("dns").unwrap();
        assert_eq!(endpoint.protocol, Protocol::Udp);
        assert_eq!(endpoint.container_port, Some(53));
        assert!(endpoint.is_external);

        let mounts: Vec<_> = dns
            .annotations()
            .of::<crate::domain::container::ContainerMountAnnotation>()
            .collect();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].source.as_deref(), Some("/srv/shop/config"));
        assert_eq!(mounts[1].source, None);
    }

    #[test]
    fn test_duplicate_endpoint_reported_with_resource() {
        let yaml = r#"
apiVersion: apphost/v1
kind: Application
metadata:
  name: shop
spec:
  resources:
    - name: api
      type: project
      path: api
      endpoints:
        - name: http
          scheme: http
        - name: http
          scheme: https
"#;
        let definition = AppDefinitionParser::parse_yaml(yaml).unwrap();
        let err = AppDefinitionParser::into_builder(&definition, "/srv/shop")
            .err()
            .unwrap();
        assert!(err.to_string().contains("Invalid resource 'api'"));
    }

    #[test]
    fn test_load_anchors_paths_at_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.yaml");
        std::fs::write(
            &path,
            r#"
apiVersion: apphost/v1
kind: Application
metadata:
  name: shop
spec:
  resources:
    - name: api
      type: project
      path: src/api
"#,
        )
        .unwrap();

        let builder = AppDefinitionParser::load(&path).unwrap();
        assert_eq!(builder.app_host_directory(), dir.path());
    }
}
