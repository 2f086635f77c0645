// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application Builder - configuration phase
//!
//! The builder is the only owner of a mutable [`ApplicationModel`]. Resources
//! are declared through `add_*` and configured through the returned
//! [`ResourceBuilder`]; [`ApplicationBuilder::build`] ends the configuration
//! phase by moving the model behind an `Arc`, after which nothing can append
//! annotations anymore.
//!
//! # Usage
//!
//! ```ignore
//! let mut builder = ApplicationBuilder::new("/src/shop");
//! builder
//!     .add_container("cache", "redis:7")?
//!     .with_endpoint(EndpointAnnotation::new("tcp", "redis").with_container_port(6379))?;
//! builder
//!     .add_project("api", "api")?
//!     .with_http_endpoint("http", None)?
//!     .with_connection_string_reference("cache");
//! let model = builder.build();
//! ```

use crate::domain::annotation::Annotation;
use crate::domain::callbacks::{
    CallbackError, CommandLineArgsCallbackAnnotation, CommandLineArgsCallbackContext,
    EnvironmentCallbackAnnotation, EnvironmentCallbackContext,
};
use crate::domain::container::{
    BuildArgumentAnnotation, ContainerEntrypointAnnotation, ContainerImageAnnotation,
    ContainerMountAnnotation, DockerfileBuildAnnotation,
};
use crate::domain::endpoint::EndpointAnnotation;
use crate::domain::manifest::{
    ManifestError, ManifestPublishingAnnotation, ManifestPublishingContext,
};
use crate::domain::manifest_path::{resolve_against, to_forward_slashes};
use crate::domain::model::{ApplicationModel, ModelError};
use crate::domain::parameter::{InputAnnotation, InputDefault, PARAMETER_VALUE_INPUT};
use crate::domain::resource::{
    ConnectionStringAnnotation, ExecutableAnnotation, ManifestMetadataAnnotation,
    ProjectAnnotation, Resource, ResourceKind,
};
use crate::domain::value::{
    ConnectionStringReference, EndpointReference, InputReference, ManifestValue,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ApplicationBuilder {
    app_host_directory: PathBuf,
    model: ApplicationModel,
}

impl ApplicationBuilder {
    /// `app_host_directory` anchors every relative path declared later.
    pub fn new(app_host_directory: impl Into<PathBuf>) -> Self {
        let app_host_directory = app_host_directory.into();
        Self {
            model: ApplicationModel::new(app_host_directory.clone()),
            app_host_directory,
        }
    }

    pub fn app_host_directory(&self) -> &Path {
        &self.app_host_directory
    }

    pub fn model(&self) -> &ApplicationModel {
        &self.model
    }

    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        kind: ResourceKind,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        let resource = self.model.add_resource(Resource::new(name, kind)?)?;
        Ok(ResourceBuilder {
            resource,
            app_host_directory: &self.app_host_directory,
        })
    }

    /// Re-open an already declared resource.
    pub fn resource(&mut self, name: &str) -> Result<ResourceBuilder<'_>, ModelError> {
        let resource = self
            .model
            .resource_mut(name)
            .ok_or_else(|| ModelError::ResourceNotFound(name.to_string()))?;
        Ok(ResourceBuilder {
            resource,
            app_host_directory: &self.app_host_directory,
        })
    }

    pub fn add_container(
        &mut self,
        name: impl Into<String>,
        image: &str,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        Ok(self
            .add_resource(name, ResourceKind::Container)?
            .attach(ContainerImageAnnotation::parse(image)))
    }

    pub fn add_executable<I, A>(
        &mut self,
        name: impl Into<String>,
        command: impl Into<String>,
        working_directory: impl AsRef<Path>,
        args: I,
    ) -> Result<ResourceBuilder<'_>, ModelError>
    where
        I: IntoIterator<Item = A>,
        A: Into<ManifestValue>,
    {
        let working_directory =
            resolve_against(&self.app_host_directory, working_directory.as_ref());
        let builder = self
            .add_resource(name, ResourceKind::Executable)?
            .attach(ExecutableAnnotation {
                command: command.into(),
                working_directory,
            });

        let args: Vec<ManifestValue> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            Ok(builder)
        } else {
            Ok(builder.attach(CommandLineArgsCallbackAnnotation::from_args(args)))
        }
    }

    pub fn add_project(
        &mut self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        let path = resolve_against(&self.app_host_directory, path.as_ref());
        Ok(self
            .add_resource(name, ResourceKind::Project)?
            .attach(ProjectAnnotation { path }))
    }

    /// Parameter resource: a single `value` input, resolved by the deployer.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        secret: bool,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        let mut input = InputAnnotation::new(PARAMETER_VALUE_INPUT);
        if secret {
            input = input.secret();
        }
        Ok(self
            .add_resource(name, ResourceKind::Parameter)?
            .attach(input))
    }

    /// Parameter resource with a default applied when the deployer supplies nothing.
    pub fn add_parameter_with_default(
        &mut self,
        name: impl Into<String>,
        secret: bool,
        default: InputDefault,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        let mut input = InputAnnotation::new(PARAMETER_VALUE_INPUT).with_default(default);
        if secret {
            input = input.secret();
        }
        Ok(self
            .add_resource(name, ResourceKind::Parameter)?
            .attach(input))
    }

    pub fn add_connection_string(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ManifestValue>,
    ) -> Result<ResourceBuilder<'_>, ModelError> {
        Ok(self
            .add_resource(name, ResourceKind::ConnectionString)?
            .with_connection_string(value))
    }

    /// End the configuration phase.
    pub fn build(self) -> Arc<ApplicationModel> {
        tracing::debug!(
            resources = self.model.len(),
            app_host_directory = %self.app_host_directory.display(),
            "Application model frozen"
        );
        Arc::new(self.model)
    }
}

/// Fluent configuration of one resource.
pub struct ResourceBuilder<'a> {
    resource: &'a mut Resource,
    app_host_directory: &'a Path,
}

impl<'a> ResourceBuilder<'a> {
    pub fn name(&self) -> &str {
        self.resource.name()
    }

    pub fn resource(&self) -> &Resource {
        &*self.resource
    }

    /// Endpoint annotations are checked like [`ResourceBuilder::with_endpoint`].
    pub fn with_annotation(self, annotation: impl Into<Annotation>) -> Result<Self, ModelError> {
        self.resource.annotate(annotation)?;
        Ok(self)
    }

    fn attach(self, annotation: impl Into<Annotation>) -> Self {
        self.resource.attach(annotation);
        self
    }

    pub fn with_endpoint(self, endpoint: EndpointAnnotation) -> Result<Self, ModelError> {
        self.resource.declare_endpoint(endpoint)?;
        Ok(self)
    }

    pub fn with_http_endpoint(
        self,
        name: impl Into<String>,
        port: Option<u16>,
    ) -> Result<Self, ModelError> {
        let mut endpoint = EndpointAnnotation::new(name, "http");
        if let Some(port) = port {
            endpoint = endpoint.with_port(port);
        }
        self.with_endpoint(endpoint)
    }

    /// Relative sources are resolved against the app host directory now, so the
    /// manifest can later rewrite them relative to its own location.
    pub fn with_bind_mount(
        self,
        source: impl AsRef<Path>,
        target: impl Into<String>,
        read_only: bool,
    ) -> Self {
        let source = resolve_against(self.app_host_directory, source.as_ref());
        self.attach(ContainerMountAnnotation::bind(
            to_forward_slashes(&source),
            target,
            read_only,
        ))
    }

    /// `name: None` declares an anonymous volume.
    pub fn with_volume(
        self,
        name: Option<&str>,
        target: impl Into<String>,
        read_only: bool,
    ) -> Self {
        self.attach(ContainerMountAnnotation::volume(name, target, read_only))
    }

    pub fn with_environment(self, key: impl Into<String>, value: impl Into<ManifestValue>) -> Self {
        self.attach(EnvironmentCallbackAnnotation::from_pair(key, value))
    }

    pub fn with_environment_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&mut EnvironmentCallbackContext<'_>) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.attach(EnvironmentCallbackAnnotation::new(callback))
    }

    pub fn with_args<I, A>(self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<ManifestValue>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.attach(CommandLineArgsCallbackAnnotation::from_args(args))
    }

    pub fn with_args_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&mut CommandLineArgsCallbackContext<'_>) -> Result<(), CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.attach(CommandLineArgsCallbackAnnotation::new(callback))
    }

    pub fn with_entrypoint(self, entrypoint: impl Into<String>) -> Self {
        self.attach(ContainerEntrypointAnnotation {
            entrypoint: entrypoint.into(),
        })
    }

    pub fn with_input(self, input: InputAnnotation) -> Self {
        self.attach(input)
    }

    pub fn with_metadata(
        self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attach(ManifestMetadataAnnotation {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn with_build_arg(self, name: impl Into<String>, value: impl Into<ManifestValue>) -> Self {
        self.attach(BuildArgumentAnnotation::new(name, value))
    }

    /// Build the image from `context`; the Dockerfile defaults to `<context>/Dockerfile`
    /// and a relative Dockerfile path is taken from the context directory.
    pub fn with_dockerfile(self, context: impl AsRef<Path>, dockerfile: Option<&Path>) -> Self {
        let context = resolve_against(self.app_host_directory, context.as_ref());
        let dockerfile =
            resolve_against(&context, dockerfile.unwrap_or_else(|| Path::new("Dockerfile")));
        self.attach(DockerfileBuildAnnotation::new(context, dockerfile))
    }

    pub fn with_connection_string(self, value: impl Into<ManifestValue>) -> Self {
        self.attach(ConnectionStringAnnotation {
            value: value.into(),
        })
    }

    pub fn with_manifest_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&mut ManifestPublishingContext<'_>, &Resource) -> Result<(), ManifestError>
            + Send
            + Sync
            + 'static,
    {
        self.attach(ManifestPublishingAnnotation::callback(callback))
    }

    pub fn exclude_from_manifest(self) -> Self {
        self.attach(ManifestPublishingAnnotation::Exclude)
    }

    /// `ConnectionStrings__<source>` = `{source.connectionString}`
    pub fn with_connection_string_reference(self, source: &str) -> Self {
        self.with_environment(
            format!("ConnectionStrings__{}", source),
            ConnectionStringReference::new(source),
        )
    }

    /// `services__<source>__<endpoint>__0` = `{source.bindings.endpoint.url}`
    pub fn with_service_reference(self, source: &str, endpoint: &str) -> Self {
        self.with_environment(
            format!("services__{}__{}__0", source, endpoint),
            EndpointReference::url(source, endpoint),
        )
    }

    /// `<variable>` = `{parameter.inputs.value}`
    pub fn with_parameter_reference(self, variable: impl Into<String>, parameter: &str) -> Self {
        self.with_environment(variable, InputReference::parameter(parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callbacks::ExecutionContext;

    #[test]
    fn test_duplicate_resource_rejected_through_builder() {
        let mut builder = ApplicationBuilder::new("/app");
        builder.add_container("cache", "redis:7").unwrap();
        let err = builder.add_project("cache", "cache").err().unwrap();
        assert_eq!(err, ModelError::DuplicateResourceName("cache".to_string()));
    }

    #[test]
    fn test_relative_paths_resolved_against_app_host_directory() {
        let mut builder = ApplicationBuilder::new("/app/host");
        builder
            .add_container("web", "nginx")
            .unwrap()
            .with_bind_mount("../config", "/etc/nginx", true)
            .with_dockerfile("web", None);
        builder.add_project("api", "./src/api").unwrap();
        let model = builder.build();

        let web = model.resource("web").unwrap();
        let mount = web.annotations().first::<ContainerMountAnnotation>().unwrap();
        assert_eq!(mount.source.as_deref(), Some("/app/config"));
        let build = web.annotations().first::<DockerfileBuildAnnotation>().unwrap();
        assert_eq!(build.dockerfile_path, PathBuf::from("/app/host/web/Dockerfile"));

        let api = model.resource("api").unwrap();
        let project = api.annotations().first::<ProjectAnnotation>().unwrap();
        assert_eq!(project.path, PathBuf::from("/app/host/src/api"));
    }

    #[test]
    fn test_references_render_as_expressions() {
        let mut builder = ApplicationBuilder::new("/app");
        builder
            .add_project("api", "api")
            .unwrap()
            .with_connection_string_reference("db")
            .with_service_reference("catalog", "http")
            .with_parameter_reference("API_KEY", "api-key");
        let model = builder.build();

        let env = model
            .resource("api")
            .unwrap()
            .environment(ExecutionContext::Publish)
            .unwrap();
        assert_eq!(
            env["ConnectionStrings__db"].to_manifest_string().unwrap(),
            "{db.connectionString}"
        );
        assert_eq!(
            env["services__catalog__http__0"].to_manifest_string().unwrap(),
            "{catalog.bindings.http.url}"
        );
        assert_eq!(env["API_KEY"].to_manifest_string().unwrap(), "{api-key.inputs.value}");
    }

    #[test]
    fn test_endpoint_annotation_cannot_shadow_declared_endpoint() {
        let mut builder = ApplicationBuilder::new("/app");
        let err = builder
            .add_project("api", "api")
            .unwrap()
            .with_http_endpoint("http", None)
            .unwrap()
            .with_annotation(EndpointAnnotation::new("http", "https"))
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::DuplicateEndpointName { .. }));

        let model = builder.build();
        assert_eq!(model.resource("api").unwrap().endpoints().count(), 1);
    }

    #[test]
    fn test_reopen_unknown_resource_fails() {
        let mut builder = ApplicationBuilder::new("/app");
        assert!(matches!(
            builder.resource("missing"),
            Err(ModelError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_executable_args_become_callback() {
        let mut builder = ApplicationBuilder::new("/app");
        builder
            .add_executable("worker", "python", "worker", ["main.py", "--verbose"])
            .unwrap();
        let model = builder.build();

        let args = model
            .resource("worker")
            .unwrap()
            .arguments(ExecutionContext::Run)
            .unwrap();
        let rendered: Vec<String> = args.iter().map(|a| a.to_manifest_string().unwrap()).collect();
        assert_eq!(rendered, vec!["main.py", "--verbose"]);
    }
}
