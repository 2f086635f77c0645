// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Manifest Entries
//!
//! Builds the JSON entry of a single resource. The walk over the model, the
//! cancellation checks and the output sink live in
//! `application::manifest_publisher`; this module knows how each resource
//! kind is described.
//!
//! Custom resource kinds (cloud resources) attach a
//! [`ManifestPublishingAnnotation::Callback`] and use the same
//! [`ManifestPublishingContext`] helpers the built-in kinds use.
//!
//! ## Entry Layout
//!
//! | Kind | `type` | Fields |
//! |------|--------|--------|
//! | Container | `container.v0` | `image`, `entrypoint`, `args`, `env`, `bindings` (1) |
//! | Executable | `executable.v0` | `command`, `workingDirectory`, `args`, `env`, `bindings` |
//! | Project | `project.v0` | `path`, `args`, `env`, `bindings` |
//! | Parameter | `parameter.v0` | `value`, `inputs` |
//! | ConnectionString | `value.v0` | `connectionString` |
//!
//! (1) Containers also write `bindMounts`, `volumes`, `inputs`, `build` and
//! `buildArgs`.
//!
//! Every kind also writes `connectionString` and `metadata` when present.
//! Empty collections are omitted.

use crate::domain::callbacks::{CallbackError, ExecutionContext};
use crate::domain::container::{
    ContainerEntrypointAnnotation, ContainerImageAnnotation, ContainerMountAnnotation,
    DockerfileBuildAnnotation, MountKind,
};
use crate::domain::manifest_path::ManifestPathResolver;
use crate::domain::model::ApplicationModel;
use crate::domain::parameter::{InputAnnotation, PARAMETER_VALUE_INPUT};
use crate::domain::resource::{
    ExecutableAnnotation, ManifestMetadataAnnotation, ProjectAnnotation, Resource, ResourceKind,
};
use crate::domain::value::{InputReference, ManifestValue, ValueError, ValueExpression};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot resolve the directory of manifest {path:?}: {reason}")]
    ManifestDirectoryUnresolved { path: PathBuf, reason: String },

    #[error("Container resource '{resource}' has no image reference")]
    MissingImage { resource: String },

    #[error("Resource '{resource}' is missing its {annotation} annotation")]
    MissingAnnotation {
        resource: String,
        annotation: &'static str,
    },

    #[error("Resource '{resource}' has an unsupported value in '{field}': {source}")]
    UnsupportedValue {
        resource: String,
        field: String,
        #[source]
        source: ValueError,
    },

    #[error("Callback of resource '{resource}' failed: {source}")]
    Callback {
        resource: String,
        #[source]
        source: CallbackError,
    },

    #[error("Manifest publishing was cancelled")]
    Cancelled,

    #[error("Failed to write manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize manifest: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ManifestCallback = Arc<
    dyn Fn(&mut ManifestPublishingContext<'_>, &Resource) -> Result<(), ManifestError>
        + Send
        + Sync,
>;

/// Overrides how (or whether) a resource appears in the manifest.
#[derive(Clone)]
pub enum ManifestPublishingAnnotation {
    Callback(ManifestCallback),
    Exclude,
}

impl ManifestPublishingAnnotation {
    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&mut ManifestPublishingContext<'_>, &Resource) -> Result<(), ManifestError>
            + Send
            + Sync
            + 'static,
    {
        Self::Callback(Arc::new(callback))
    }
}

impl fmt::Debug for ManifestPublishingAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("ManifestPublishingAnnotation::Callback"),
            Self::Exclude => f.write_str("ManifestPublishingAnnotation::Exclude"),
        }
    }
}

/// Whether the resource is skipped by the manifest engine.
pub fn is_excluded_from_manifest(resource: &Resource) -> bool {
    matches!(
        resource.annotations().last::<ManifestPublishingAnnotation>(),
        Some(ManifestPublishingAnnotation::Exclude)
    )
}

/// Accumulates the JSON entry of one resource.
pub struct ManifestPublishingContext<'a> {
    model: &'a ApplicationModel,
    paths: &'a ManifestPathResolver,
    entry: Map<String, Value>,
}

impl<'a> ManifestPublishingContext<'a> {
    pub fn new(model: &'a ApplicationModel, paths: &'a ManifestPathResolver) -> Self {
        Self {
            model,
            paths,
            entry: Map::new(),
        }
    }

    pub fn model(&self) -> &ApplicationModel {
        self.model
    }

    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::Publish
    }

    pub fn manifest_directory(&self) -> &Path {
        self.paths.manifest_directory()
    }

    pub fn relative_path(&self, path: impl AsRef<Path>) -> String {
        self.paths.relative_path(path.as_ref())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entry.insert(key.into(), value.into());
    }

    pub fn entry(&self) -> &Map<String, Value> {
        &self.entry
    }

    pub fn into_entry(self) -> Map<String, Value> {
        self.entry
    }

    /// Write the entry for `resource`, honoring a publishing callback if one is attached.
    pub fn write_resource(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        if let Some(ManifestPublishingAnnotation::Callback(callback)) =
            resource.annotations().last::<ManifestPublishingAnnotation>()
        {
            return callback(self, resource);
        }

        match resource.kind() {
            ResourceKind::Container => self.write_container(resource),
            ResourceKind::Executable => self.write_executable(resource),
            ResourceKind::Project => self.write_project(resource),
            ResourceKind::Parameter => self.write_parameter(resource),
            ResourceKind::ConnectionString => self.write_value(resource),
            ResourceKind::Custom(kind) => {
                self.set("type", kind.as_str());
                self.write_connection_string(resource)?;
                self.write_metadata(resource);
                Ok(())
            }
        }
    }

    pub fn write_container(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        self.set("type", ResourceKind::Container.manifest_type());
        self.write_connection_string(resource)?;

        let image = resource
            .annotations()
            .last::<ContainerImageAnnotation>()
            .ok_or_else(|| ManifestError::MissingImage {
                resource: resource.name().to_string(),
            })?;
        self.set("image", image.reference());

        if let Some(entrypoint) = resource.annotations().last::<ContainerEntrypointAnnotation>() {
            self.set("entrypoint", entrypoint.entrypoint.as_str());
        }

        self.write_args(resource)?;
        self.write_mounts(resource);
        self.write_environment(resource)?;
        self.write_bindings(resource, true);
        self.write_inputs(resource);
        self.write_metadata(resource);
        self.write_build(resource)?;
        Ok(())
    }

    pub fn write_executable(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        let executable = resource
            .annotations()
            .last::<ExecutableAnnotation>()
            .ok_or_else(|| ManifestError::MissingAnnotation {
                resource: resource.name().to_string(),
                annotation: "executable",
            })?;

        self.set("type", ResourceKind::Executable.manifest_type());
        self.write_connection_string(resource)?;
        self.set("command", executable.command.as_str());
        let working_directory = self.relative_path(&executable.working_directory);
        self.set("workingDirectory", working_directory);
        self.write_args(resource)?;
        self.write_environment(resource)?;
        self.write_bindings(resource, false);
        self.write_metadata(resource);
        Ok(())
    }

    pub fn write_project(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        let project = resource
            .annotations()
            .last::<ProjectAnnotation>()
            .ok_or_else(|| ManifestError::MissingAnnotation {
                resource: resource.name().to_string(),
                annotation: "project",
            })?;

        self.set("type", ResourceKind::Project.manifest_type());
        self.write_connection_string(resource)?;
        let path = self.relative_path(&project.path);
        self.set("path", path);
        self.write_args(resource)?;
        self.write_environment(resource)?;
        self.write_bindings(resource, false);
        self.write_metadata(resource);
        Ok(())
    }

    pub fn write_parameter(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        self.set("type", ResourceKind::Parameter.manifest_type());
        self.write_connection_string(resource)?;
        self.set(
            "value",
            InputReference::new(resource.name(), PARAMETER_VALUE_INPUT).manifest_expression(),
        );
        self.write_inputs(resource);
        self.write_metadata(resource);
        Ok(())
    }

    pub fn write_value(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        self.set("type", ResourceKind::ConnectionString.manifest_type());
        self.write_connection_string(resource)?;
        self.write_metadata(resource);
        Ok(())
    }

    pub fn write_connection_string(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        if let Some(value) = resource.connection_string() {
            let text = manifest_text(resource, "connectionString", value)?;
            self.set("connectionString", text);
        }
        Ok(())
    }

    /// Evaluate every environment callback (publish mode) and write `env`.
    pub fn write_environment(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        let environment = resource
            .environment(ExecutionContext::Publish)
            .map_err(|source| ManifestError::Callback {
                resource: resource.name().to_string(),
                source,
            })?;

        let mut env = Map::new();
        for (key, value) in &environment {
            let text = manifest_text(resource, &format!("env.{}", key), value)?;
            env.insert(key.clone(), Value::String(text));
        }
        if !env.is_empty() {
            self.set("env", env);
        }
        Ok(())
    }

    pub fn write_args(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        let args = resource
            .arguments(ExecutionContext::Publish)
            .map_err(|source| ManifestError::Callback {
                resource: resource.name().to_string(),
                source,
            })?;

        let mut written = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            written.push(Value::String(manifest_text(
                resource,
                &format!("args[{}]", position),
                arg,
            )?));
        }
        if !written.is_empty() {
            self.set("args", written);
        }
        Ok(())
    }

    pub fn write_bindings(&mut self, resource: &Resource, emit_container_port: bool) {
        let mut bindings = Map::new();
        for endpoint in resource.endpoints() {
            let mut binding = Map::new();
            binding.insert("scheme".to_string(), json!(endpoint.scheme));
            binding.insert("protocol".to_string(), json!(endpoint.protocol.as_str()));
            binding.insert("transport".to_string(), json!(endpoint.transport));
            if emit_container_port {
                if let Some(container_port) = endpoint.container_port {
                    binding.insert("containerPort".to_string(), json!(container_port));
                }
            }
            if endpoint.is_external {
                binding.insert("external".to_string(), json!(true));
            }
            bindings.insert(endpoint.name.clone(), Value::Object(binding));
        }
        if !bindings.is_empty() {
            self.set("bindings", bindings);
        }
    }

    pub fn write_inputs(&mut self, resource: &Resource) {
        let mut inputs = Map::new();
        for input in resource.annotations().of::<InputAnnotation>() {
            let mut written = Map::new();
            written.insert("type".to_string(), json!(input.input_type));
            if input.secret {
                written.insert("secret".to_string(), json!(true));
            }
            if let Some(default) = &input.default {
                written.insert("default".to_string(), json!(default));
            }
            inputs.insert(input.name.clone(), Value::Object(written));
        }
        if !inputs.is_empty() {
            self.set("inputs", inputs);
        }
    }

    pub fn write_metadata(&mut self, resource: &Resource) {
        let metadata: Map<String, Value> = resource
            .annotations()
            .of::<ManifestMetadataAnnotation>()
            .map(|annotation| (annotation.key.clone(), annotation.value.clone()))
            .collect();
        if !metadata.is_empty() {
            self.set("metadata", metadata);
        }
    }

    /// `bindMounts` and `volumes`, each in declaration order.
    pub fn write_mounts(&mut self, resource: &Resource) {
        let mut bind_mounts = Vec::new();
        let mut volumes = Vec::new();

        for mount in resource.annotations().of::<ContainerMountAnnotation>() {
            let mut written = Map::new();
            match mount.kind {
                MountKind::BindMount => {
                    if let Some(source) = &mount.source {
                        written.insert("source".to_string(), json!(self.relative_path(source)));
                    }
                    written.insert("target".to_string(), json!(mount.target));
                    written.insert("readOnly".to_string(), json!(mount.read_only));
                    bind_mounts.push(Value::Object(written));
                }
                MountKind::Volume => {
                    if let Some(name) = &mount.source {
                        written.insert("name".to_string(), json!(name));
                    }
                    written.insert("target".to_string(), json!(mount.target));
                    written.insert("readOnly".to_string(), json!(mount.read_only));
                    volumes.push(Value::Object(written));
                }
            }
        }

        if !bind_mounts.is_empty() {
            self.set("bindMounts", bind_mounts);
        }
        if !volumes.is_empty() {
            self.set("volumes", volumes);
        }
    }

    /// `build` (when a Dockerfile is declared) and `buildArgs`.
    pub fn write_build(&mut self, resource: &Resource) -> Result<(), ManifestError> {
        if let Some(build) = resource.annotations().last::<DockerfileBuildAnnotation>() {
            let context = self.relative_path(&build.context_path);
            let dockerfile = self.relative_path(&build.dockerfile_path);
            self.set("build", json!({ "context": context, "dockerfile": dockerfile }));
        }

        let mut build_args = Map::new();
        for (name, value) in &resource.build_arguments() {
            let text = manifest_text(resource, &format!("buildArgs.{}", name), value)?;
            build_args.insert(name.clone(), Value::String(text));
        }
        if !build_args.is_empty() {
            self.set("buildArgs", build_args);
        }
        Ok(())
    }
}

fn manifest_text(
    resource: &Resource,
    field: &str,
    value: &ManifestValue,
) -> Result<String, ManifestError> {
    value
        .to_manifest_string()
        .map_err(|source| ManifestError::UnsupportedValue {
            resource: resource.name().to_string(),
            field: field.to_string(),
            source,
        })
}
