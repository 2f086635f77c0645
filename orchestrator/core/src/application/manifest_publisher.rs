// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manifest Publisher
//!
//! Walks the frozen model once, in declaration order, and turns it into the
//! deployment manifest:
//!
//! ```json
//! { "resources": { "<name>": { "type": "container.v0", ... } } }
//! ```
//!
//! The document is built completely in memory before anything is written, so
//! a failing resource, an unsupported value or a cancellation leaves no
//! partial file behind. Keys are emitted in sorted order; publishing the same
//! model twice yields byte-identical output.

use crate::domain::manifest::{is_excluded_from_manifest, ManifestError, ManifestPublishingContext};
use crate::domain::manifest_path::ManifestPathResolver;
use crate::domain::model::ApplicationModel;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedManifest {
    pub path: PathBuf,
    pub resource_count: usize,
}

pub struct ManifestPublisher {
    manifest_path: PathBuf,
}

impl ManifestPublisher {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Build the manifest document without writing it.
    pub fn build_document(
        &self,
        model: &ApplicationModel,
        cancellation: &CancellationToken,
    ) -> Result<Value, ManifestError> {
        let paths = ManifestPathResolver::for_manifest(&self.manifest_path)?;
        let mut resources = Map::new();

        for resource in model.resources() {
            if cancellation.is_cancelled() {
                return Err(ManifestError::Cancelled);
            }

            if is_excluded_from_manifest(resource) {
                debug!(resource = %resource.name(), "Resource excluded from manifest");
                continue;
            }

            let mut context = ManifestPublishingContext::new(model, &paths);
            context.write_resource(resource)?;
            resources.insert(resource.name().to_string(), Value::Object(context.into_entry()));
        }

        let mut document = Map::new();
        document.insert("resources".to_string(), Value::Object(resources));
        Ok(Value::Object(document))
    }

    /// Pretty-printed manifest text, newline terminated.
    pub fn render(
        &self,
        model: &ApplicationModel,
        cancellation: &CancellationToken,
    ) -> Result<String, ManifestError> {
        let document = self.build_document(model, cancellation)?;
        let mut text = serde_json::to_string_pretty(&document)?;
        text.push('\n');
        Ok(text)
    }

    /// Render the manifest into an arbitrary sink (e.g. stdout).
    pub fn write_to<W: Write>(
        &self,
        model: &ApplicationModel,
        cancellation: &CancellationToken,
        writer: &mut W,
    ) -> Result<(), ManifestError> {
        let text = self.render(model, cancellation)?;
        if cancellation.is_cancelled() {
            return Err(ManifestError::Cancelled);
        }
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Render the manifest and write it to the manifest path.
    pub async fn publish(
        &self,
        model: &ApplicationModel,
        cancellation: &CancellationToken,
    ) -> Result<PublishedManifest, ManifestError> {
        let text = self.render(model, cancellation)?;

        if cancellation.is_cancelled() {
            return Err(ManifestError::Cancelled);
        }

        if let Some(parent) = self.manifest_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.manifest_path, text).await?;

        let resource_count = model
            .resources()
            .filter(|resource| !is_excluded_from_manifest(resource))
            .count();

        metrics::counter!("apphost_manifest_writes_total").increment(1);
        info!(
            path = %self.manifest_path.display(),
            resources = resource_count,
            "Manifest published"
        );

        Ok(PublishedManifest {
            path: self.manifest_path.clone(),
            resource_count,
        })
    }
}
