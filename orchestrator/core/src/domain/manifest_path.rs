// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Manifest Path Resolution
//!
//! Every filesystem path written into a manifest is expressed relative to
//! the manifest's own directory, with `/` separators regardless of the host,
//! so the manifest can be moved together with the project it describes.
//!
//! Resolution is purely lexical: nothing here touches the filesystem, so
//! paths that do not exist yet (build outputs, volumes created later) are
//! handled the same way as existing ones.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Path normalization for the manifest publishing engine

use crate::domain::manifest::ManifestError;
use std::path::{Component, Path, PathBuf};

/// Resolves paths relative to the directory of one manifest document.
#[derive(Debug, Clone)]
pub struct ManifestPathResolver {
    manifest_directory: PathBuf,
}

impl ManifestPathResolver {
    /// Resolver for the manifest written at `manifest_path`.
    ///
    /// Relative manifest paths are anchored at the current working directory.
    /// Fails when no containing directory can be determined.
    pub fn for_manifest(manifest_path: &Path) -> Result<Self, ManifestError> {
        let unresolved = |reason: String| ManifestError::ManifestDirectoryUnresolved {
            path: manifest_path.to_path_buf(),
            reason,
        };

        if manifest_path.as_os_str().is_empty() {
            return Err(unresolved("manifest path is empty".to_string()));
        }

        let absolute = if manifest_path.is_absolute() {
            manifest_path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| unresolved(format!("current directory is unavailable: {}", e)))?
                .join(manifest_path)
        };

        let normalized = normalize_lexically(&absolute);
        let directory = normalized
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| unresolved("manifest path has no parent directory".to_string()))?;

        Ok(Self {
            manifest_directory: directory.to_path_buf(),
        })
    }

    pub fn new(manifest_directory: impl AsRef<Path>) -> Self {
        Self {
            manifest_directory: normalize_lexically(manifest_directory.as_ref()),
        }
    }

    pub fn manifest_directory(&self) -> &Path {
        &self.manifest_directory
    }

    /// `path` relative to the manifest directory, `/`-separated.
    ///
    /// Relative inputs are taken as already relative to the manifest directory.
    /// Paths on a different root (e.g. another drive) stay absolute.
    pub fn relative_path(&self, path: &Path) -> String {
        let absolute = resolve_against(&self.manifest_directory, path);
        match relative_to(&absolute, &self.manifest_directory) {
            Some(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Some(relative) => to_forward_slashes(&relative),
            None => to_forward_slashes(&absolute),
        }
    }
}

/// Join `path` onto `base` unless it is already absolute, then normalize.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&base.join(path))
    }
}

/// Remove `.` components and fold `..` into their parent.
///
/// `..` at the root of an absolute path is dropped; leading `..` of a
/// relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                normalized.push(component);
            }
            Component::CurDir => {
                // Skip "." components
            }
            Component::ParentDir => {
                let ends_with_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if ends_with_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => {
                normalized.push(part);
            }
        }
    }
    normalized
}

fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.has_root() != base.has_root() {
        return None;
    }

    let path_components: Vec<Component<'_>> = path.components().collect();
    let base_components: Vec<Component<'_>> = base.components().collect();

    // Different prefixes (Windows drives) cannot be related.
    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (path_components.first(), base_components.first())
    {
        if a != b {
            return None;
        }
    }

    let common = path_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component);
    }
    Some(relative)
}

/// Host-independent rendering with `/` separators.
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
