// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Resource
//!
//! A [`Resource`] is a named unit of the application (container, executable,
//! project, parameter, connection string or custom cloud resource) owning one
//! [`AnnotationCollection`]. Its name is the key used by the notification
//! service, the endpoint report and the manifest.
//!
//! Resources are only mutable through `&mut` during the configuration phase.
//! Once the model is frozen (see `ApplicationBuilder::build`) every reader
//! holds a shared reference and the collection can be read without locking.

use crate::domain::annotation::{Annotation, AnnotationCollection};
use crate::domain::callbacks::{
    CallbackError, CommandLineArgsCallbackAnnotation, CommandLineArgsCallbackContext,
    EnvironmentCallbackAnnotation, EnvironmentCallbackContext, ExecutionContext,
};
use crate::domain::container::{BuildArgumentAnnotation, DockerfileBuildAnnotation};
use crate::domain::endpoint::{EndpointAnnotation, EndpointUri};
use crate::domain::model::ModelError;
use crate::domain::parameter::InputAnnotation;
use crate::domain::value::{EndpointReference, ManifestValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Resource kind; drives the manifest `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Container,
    Executable,
    Project,
    Parameter,
    ConnectionString,
    /// Cloud or otherwise custom resource, carrying its manifest type (e.g. `azure.bicep.v0`).
    Custom(String),
}

impl ResourceKind {
    pub fn manifest_type(&self) -> &str {
        match self {
            Self::Container => "container.v0",
            Self::Executable => "executable.v0",
            Self::Project => "project.v0",
            Self::Parameter => "parameter.v0",
            Self::ConnectionString => "value.v0",
            Self::Custom(kind) => kind,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_type())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableAnnotation {
    pub command: String,
    pub working_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAnnotation {
    pub path: PathBuf,
}

/// Connection string the resource exposes to its consumers.
#[derive(Debug, Clone)]
pub struct ConnectionStringAnnotation {
    pub value: ManifestValue,
}

/// Free-form entry of the manifest `metadata` object.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestMetadataAnnotation {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    kind: ResourceKind,
    annotations: AnnotationCollection,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Result<Self, ModelError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            kind,
            annotations: AnnotationCollection::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    /// Append an annotation. Endpoints are routed through
    /// [`Resource::declare_endpoint`] so their names stay unique.
    pub fn annotate(&mut self, annotation: impl Into<Annotation>) -> Result<(), ModelError> {
        match annotation.into() {
            Annotation::Endpoint(endpoint) => self.declare_endpoint(endpoint),
            other => {
                self.annotations.push(other);
                Ok(())
            }
        }
    }

    /// Append a non-endpoint annotation; endpoint payloads are not accepted here.
    pub(crate) fn attach(&mut self, annotation: impl Into<Annotation>) {
        let annotation = annotation.into();
        debug_assert!(!matches!(annotation, Annotation::Endpoint(_)));
        self.annotations.push(annotation);
    }

    pub fn declare_endpoint(&mut self, endpoint: EndpointAnnotation) -> Result<(), ModelError> {
        if self.endpoint(&endpoint.name).is_some() {
            return Err(ModelError::DuplicateEndpointName {
                resource: self.name.clone(),
                endpoint: endpoint.name,
            });
        }
        self.annotations.push(endpoint);
        Ok(())
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointAnnotation> {
        self.annotations.of::<EndpointAnnotation>()
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointAnnotation> {
        self.endpoints().find(|endpoint| endpoint.name == name)
    }

    /// Reference to one of this resource's endpoints, for wiring into other resources.
    pub fn endpoint_reference(&self, endpoint: &str) -> EndpointReference {
        EndpointReference::url(self.name.clone(), endpoint)
    }

    /// `(Name, UriString)` for every endpoint allocated so far, in declaration order.
    /// Endpoints still waiting for the allocator are omitted.
    pub fn allocated_endpoints(&self) -> Vec<EndpointUri> {
        self.endpoints()
            .filter_map(|endpoint| {
                endpoint.allocated_endpoint().map(|allocated| EndpointUri {
                    name: endpoint.name.clone(),
                    uri: allocated.uri_string,
                })
            })
            .collect()
    }

    /// The last connection string declared wins.
    pub fn connection_string(&self) -> Option<&ManifestValue> {
        self.annotations
            .last::<ConnectionStringAnnotation>()
            .map(|annotation| &annotation.value)
    }

    pub fn input(&self, name: &str) -> Option<&InputAnnotation> {
        self.annotations
            .of::<InputAnnotation>()
            .find(|input| input.name == name)
    }

    /// Run every environment callback in insertion order, then add one entry per
    /// endpoint that names an environment variable.
    ///
    /// Endpoint entries are applied last and replace user values with the same key.
    pub fn environment(
        &self,
        execution_context: ExecutionContext,
    ) -> Result<BTreeMap<String, ManifestValue>, CallbackError> {
        let mut context = EnvironmentCallbackContext::new(&self.name, execution_context);
        for callback in self.annotations.of::<EnvironmentCallbackAnnotation>() {
            callback.invoke(&mut context)?;
        }

        for endpoint in self.endpoints() {
            if let Some(variable) = &endpoint.environment_variable {
                context.set(
                    variable.clone(),
                    EndpointReference::port(self.name.clone(), endpoint.name.clone()),
                );
            }
        }

        Ok(context.into_environment())
    }

    pub fn arguments(
        &self,
        execution_context: ExecutionContext,
    ) -> Result<Vec<ManifestValue>, CallbackError> {
        let mut context = CommandLineArgsCallbackContext::new(&self.name, execution_context);
        for callback in self.annotations.of::<CommandLineArgsCallbackAnnotation>() {
            callback.invoke(&mut context)?;
        }
        Ok(context.into_args())
    }

    /// Build arguments from Dockerfile builds and standalone entries, later keys win.
    pub fn build_arguments(&self) -> BTreeMap<String, ManifestValue> {
        let mut build_args = BTreeMap::new();
        for annotation in self.annotations.iter() {
            match annotation {
                Annotation::DockerfileBuild(DockerfileBuildAnnotation { build_args: args, .. }) => {
                    for (name, value) in args {
                        build_args.insert(name.clone(), value.clone());
                    }
                }
                Annotation::BuildArgument(BuildArgumentAnnotation { name, value }) => {
                    build_args.insert(name.clone(), value.clone());
                }
                _ => {}
            }
        }
        build_args
    }
}

fn validate_name(name: &str) -> Result<(), ModelError> {
    let invalid = |reason: &str| ModelError::InvalidResourceName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > 64 {
        return Err(invalid("name must be at most 64 characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(invalid("name must start with an ASCII letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("only ASCII letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::AllocatedEndpoint;

    #[test]
    fn test_name_validation() {
        assert!(Resource::new("api-service_1", ResourceKind::Project).is_ok());
        assert!(matches!(
            Resource::new("", ResourceKind::Project),
            Err(ModelError::InvalidResourceName { .. })
        ));
        assert!(matches!(
            Resource::new("my.api", ResourceKind::Project),
            Err(ModelError::InvalidResourceName { .. })
        ));
        assert!(matches!(
            Resource::new("1api", ResourceKind::Project),
            Err(ModelError::InvalidResourceName { .. })
        ));
    }

    #[test]
    fn test_duplicate_endpoint_name_rejected() {
        let mut resource = Resource::new("api", ResourceKind::Project).unwrap();
        resource.declare_endpoint(EndpointAnnotation::new("http", "http")).unwrap();

        let err = resource
            .declare_endpoint(EndpointAnnotation::new("http", "https"))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateEndpointName { .. }));
        assert_eq!(resource.endpoints().count(), 1);
    }

    #[test]
    fn test_annotate_checks_endpoint_names() {
        let mut resource = Resource::new("api", ResourceKind::Project).unwrap();
        resource.annotate(EndpointAnnotation::new("http", "http")).unwrap();

        let err = resource
            .annotate(Annotation::Endpoint(EndpointAnnotation::new("http", "https")))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateEndpointName { .. }));
        assert_eq!(resource.endpoints().count(), 1);
        assert_eq!(resource.endpoint("http").unwrap().scheme, "http");
    }

    #[test]
    fn test_allocated_view_omits_pending_endpoints() {
        let mut resource = Resource::new("api", ResourceKind::Project).unwrap();
        resource.declare_endpoint(EndpointAnnotation::new("http", "http")).unwrap();
        resource.declare_endpoint(EndpointAnnotation::new("https", "https")).unwrap();

        resource
            .endpoint("https")
            .unwrap()
            .attach_allocation(AllocatedEndpoint::new("https", "localhost", 7001));

        assert_eq!(
            resource.allocated_endpoints(),
            vec![EndpointUri {
                name: "https".to_string(),
                uri: "https://localhost:7001".to_string(),
            }]
        );
    }

    #[test]
    fn test_endpoint_environment_overwrites_user_value() {
        let mut resource = Resource::new("web", ResourceKind::Container).unwrap();
        resource.annotate(EnvironmentCallbackAnnotation::from_pair("PORT", "80")).unwrap();
        resource
            .declare_endpoint(
                EndpointAnnotation::new("http", "http").with_environment_variable("PORT"),
            )
            .unwrap();

        let env = resource.environment(ExecutionContext::Publish).unwrap();
        assert_eq!(
            env["PORT"].to_manifest_string().unwrap(),
            "{web.bindings.http.port}"
        );
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut resource = Resource::new("web", ResourceKind::Container).unwrap();
        resource
            .annotate(EnvironmentCallbackAnnotation::new(|_| {
                Err(CallbackError::new("secret store unavailable"))
            }))
            .unwrap();

        let err = resource.environment(ExecutionContext::Run).unwrap_err();
        assert_eq!(err.to_string(), "secret store unavailable");
    }

    #[test]
    fn test_build_arguments_merge_in_order() {
        let mut resource = Resource::new("web", ResourceKind::Container).unwrap();
        resource
            .annotate(
                DockerfileBuildAnnotation::new("/app", "/app/Dockerfile")
                    .with_build_arg("VERSION", "1"),
            )
            .unwrap();
        resource.annotate(BuildArgumentAnnotation::new("VERSION", "2")).unwrap();

        let args = resource.build_arguments();
        assert_eq!(args["VERSION"].to_manifest_string().unwrap(), "2");
    }
}
