// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::value::ManifestValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Image reference of a container resource, e.g. `docker.io/library/nginx:latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImageAnnotation {
    pub registry: Option<String>,
    pub image: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ContainerImageAnnotation {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            registry: None,
            image: image.into(),
            tag: None,
            digest: None,
        }
    }

    /// Split a full reference into image, tag and digest.
    ///
    /// The registry is left inside `image`; `reference()` reassembles the
    /// original string either way.
    pub fn parse(reference: &str) -> Self {
        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (reference, None),
        };

        // A ':' before the last '/' belongs to a registry port, not a tag.
        let last_segment_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (image, tag) = match name[last_segment_start..].rfind(':') {
            Some(i) => {
                let split = last_segment_start + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        Self {
            registry: None,
            image: image.to_string(),
            tag,
            digest,
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn reference(&self) -> String {
        let mut reference = match &self.registry {
            Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), self.image),
            None => self.image.clone(),
        };
        if let Some(tag) = &self.tag {
            reference.push(':');
            reference.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            reference.push('@');
            reference.push_str(digest);
        }
        reference
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntrypointAnnotation {
    pub entrypoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MountKind {
    BindMount,
    Volume,
}

/// Bind mount or named/anonymous volume of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMountAnnotation {
    /// Host path for bind mounts (absolute once declared through the builder),
    /// volume name for volumes, `None` for anonymous volumes.
    pub source: Option<String>,
    pub target: String,
    pub kind: MountKind,
    pub read_only: bool,
}

impl ContainerMountAnnotation {
    pub fn bind(source: impl Into<String>, target: impl Into<String>, read_only: bool) -> Self {
        Self {
            source: Some(source.into()),
            target: target.into(),
            kind: MountKind::BindMount,
            read_only,
        }
    }

    pub fn volume(name: Option<&str>, target: impl Into<String>, read_only: bool) -> Self {
        Self {
            source: name.map(str::to_string),
            target: target.into(),
            kind: MountKind::Volume,
            read_only,
        }
    }
}

/// Build the container image from a Dockerfile instead of pulling it.
#[derive(Debug, Clone)]
pub struct DockerfileBuildAnnotation {
    pub context_path: PathBuf,
    pub dockerfile_path: PathBuf,
    pub build_args: Vec<(String, ManifestValue)>,
}

impl DockerfileBuildAnnotation {
    pub fn new(context_path: impl Into<PathBuf>, dockerfile_path: impl Into<PathBuf>) -> Self {
        Self {
            context_path: context_path.into(),
            dockerfile_path: dockerfile_path.into(),
            build_args: Vec::new(),
        }
    }

    pub fn with_build_arg(
        mut self,
        name: impl Into<String>,
        value: impl Into<ManifestValue>,
    ) -> Self {
        self.build_args.push((name.into(), value.into()));
        self
    }
}

/// A single `buildArgs` entry.
#[derive(Debug, Clone)]
pub struct BuildArgumentAnnotation {
    pub name: String,
    pub value: ManifestValue,
}

impl BuildArgumentAnnotation {
    pub fn new(name: impl Into<String>, value: impl Into<ManifestValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
