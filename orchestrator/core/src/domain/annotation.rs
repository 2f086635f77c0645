// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Annotation Collection
//!
//! Every facet of a resource (endpoints, environment callbacks, mounts,
//! inputs, image references, ...) is stored as an [`Annotation`] in the
//! resource's [`AnnotationCollection`]. Readers never downcast: they ask the
//! collection for a [`Capability`] or for a concrete payload type through
//! [`AnnotationKind`].
//!
//! Insertion order is significant. Callbacks of the same capability run in
//! the order they were attached, and later callbacks overwrite earlier ones
//! writing the same key.

use crate::domain::callbacks::{CommandLineArgsCallbackAnnotation, EnvironmentCallbackAnnotation};
use crate::domain::container::{
    BuildArgumentAnnotation, ContainerEntrypointAnnotation, ContainerImageAnnotation,
    ContainerMountAnnotation, DockerfileBuildAnnotation,
};
use crate::domain::endpoint::EndpointAnnotation;
use crate::domain::manifest::ManifestPublishingAnnotation;
use crate::domain::parameter::InputAnnotation;
use crate::domain::resource::{
    ConnectionStringAnnotation, ExecutableAnnotation, ManifestMetadataAnnotation, ProjectAnnotation,
};

/// Capability tag used to filter annotations at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Endpoint,
    EnvironmentCallback,
    CommandLineCallback,
    ContainerMount,
    Input,
    ManifestMetadata,
    ContainerImage,
    ContainerEntrypoint,
    Executable,
    Project,
    ConnectionString,
    DockerfileBuild,
    BuildArgument,
    ManifestPublishing,
}

/// A single piece of typed metadata attached to a resource.
#[derive(Debug, Clone)]
pub enum Annotation {
    Endpoint(EndpointAnnotation),
    EnvironmentCallback(EnvironmentCallbackAnnotation),
    CommandLineArgsCallback(CommandLineArgsCallbackAnnotation),
    ContainerMount(ContainerMountAnnotation),
    Input(InputAnnotation),
    ManifestMetadata(ManifestMetadataAnnotation),
    ContainerImage(ContainerImageAnnotation),
    ContainerEntrypoint(ContainerEntrypointAnnotation),
    Executable(ExecutableAnnotation),
    Project(ProjectAnnotation),
    ConnectionString(ConnectionStringAnnotation),
    DockerfileBuild(DockerfileBuildAnnotation),
    BuildArgument(BuildArgumentAnnotation),
    ManifestPublishing(ManifestPublishingAnnotation),
}

impl Annotation {
    /// Capabilities implemented by this annotation.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Endpoint(_) => &[Capability::Endpoint],
            Self::EnvironmentCallback(_) => &[Capability::EnvironmentCallback],
            Self::CommandLineArgsCallback(_) => &[Capability::CommandLineCallback],
            Self::ContainerMount(_) => &[Capability::ContainerMount],
            Self::Input(_) => &[Capability::Input],
            Self::ManifestMetadata(_) => &[Capability::ManifestMetadata],
            Self::ContainerImage(_) => &[Capability::ContainerImage],
            Self::ContainerEntrypoint(_) => &[Capability::ContainerEntrypoint],
            Self::Executable(_) => &[Capability::Executable],
            Self::Project(_) => &[Capability::Project],
            Self::ConnectionString(_) => &[Capability::ConnectionString],
            // A Dockerfile build both describes the build and carries its own build arguments.
            Self::DockerfileBuild(_) => &[Capability::DockerfileBuild, Capability::BuildArgument],
            Self::BuildArgument(_) => &[Capability::BuildArgument],
            Self::ManifestPublishing(_) => &[Capability::ManifestPublishing],
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Typed view over one annotation variant.
pub trait AnnotationKind: Sized {
    fn from_annotation(annotation: &Annotation) -> Option<&Self>;
}

macro_rules! annotation_kind {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl AnnotationKind for $payload {
                fn from_annotation(annotation: &Annotation) -> Option<&Self> {
                    match annotation {
                        Annotation::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }

            impl From<$payload> for Annotation {
                fn from(payload: $payload) -> Self {
                    Annotation::$variant(payload)
                }
            }
        )*
    };
}

annotation_kind! {
    Endpoint => EndpointAnnotation,
    EnvironmentCallback => EnvironmentCallbackAnnotation,
    CommandLineArgsCallback => CommandLineArgsCallbackAnnotation,
    ContainerMount => ContainerMountAnnotation,
    Input => InputAnnotation,
    ManifestMetadata => ManifestMetadataAnnotation,
    ContainerImage => ContainerImageAnnotation,
    ContainerEntrypoint => ContainerEntrypointAnnotation,
    Executable => ExecutableAnnotation,
    Project => ProjectAnnotation,
    ConnectionString => ConnectionStringAnnotation,
    DockerfileBuild => DockerfileBuildAnnotation,
    BuildArgument => BuildArgumentAnnotation,
    ManifestPublishing => ManifestPublishingAnnotation,
}

/// Ordered, append-only store of annotations owned by one resource.
#[derive(Debug, Clone, Default)]
pub struct AnnotationCollection {
    items: Vec<Annotation>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, annotation: impl Into<Annotation>) {
        self.items.push(annotation.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// All annotations implementing `capability`, in insertion order.
    pub fn with_capability(&self, capability: Capability) -> Vec<&Annotation> {
        self.items
            .iter()
            .filter(|annotation| annotation.has_capability(capability))
            .collect()
    }

    pub fn first_with_capability(&self, capability: Capability) -> Option<&Annotation> {
        self.items
            .iter()
            .find(|annotation| annotation.has_capability(capability))
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.first_with_capability(capability).is_some()
    }

    /// All payloads of type `T`, in insertion order.
    pub fn of<'a, T: AnnotationKind + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.items.iter().filter_map(T::from_annotation)
    }

    pub fn first<T: AnnotationKind>(&self) -> Option<&T> {
        self.of::<T>().next()
    }

    pub fn last<T: AnnotationKind>(&self) -> Option<&T> {
        self.of::<T>().last()
    }
}

impl<'a> IntoIterator for &'a AnnotationCollection {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::ContainerMountAnnotation;

    #[test]
    fn test_capability_filter_preserves_insertion_order() {
        let mut annotations = AnnotationCollection::new();
        annotations.push(EndpointAnnotation::new("http", "http"));
        annotations.push(ContainerMountAnnotation::volume(Some("data"), "/data", false));
        annotations.push(EndpointAnnotation::new("grpc", "https"));

        let endpoints: Vec<&str> = annotations
            .of::<EndpointAnnotation>()
            .map(|endpoint| endpoint.name.as_str())
            .collect();
        assert_eq!(endpoints, vec!["http", "grpc"]);
        assert_eq!(annotations.with_capability(Capability::Endpoint).len(), 2);
        assert_eq!(annotations.with_capability(Capability::ContainerMount).len(), 1);
    }

    #[test]
    fn test_missing_capability_is_empty_not_error() {
        let annotations = AnnotationCollection::new();
        assert!(annotations.with_capability(Capability::Input).is_empty());
        assert!(annotations.first_with_capability(Capability::Input).is_none());
        assert!(annotations.first::<InputAnnotation>().is_none());
    }

    #[test]
    fn test_dockerfile_build_counts_as_build_argument_source() {
        let build = DockerfileBuildAnnotation::new("/app", "/app/Dockerfile");
        let annotation = Annotation::from(build);
        assert!(annotation.has_capability(Capability::DockerfileBuild));
        assert!(annotation.has_capability(Capability::BuildArgument));
        assert!(!annotation.has_capability(Capability::ContainerImage));
    }
}
