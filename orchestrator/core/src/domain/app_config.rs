// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// App Host Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) controlling:
// - Where the deployment manifest is written
// - The host address and port range handed out by the endpoint allocator
// - Logging verbosity

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const APP_HOST_CONFIG_API_VERSION: &str = "apphost/v1";
pub const APP_HOST_CONFIG_KIND: &str = "AppHostConfig";

/// Top-level app host configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppHostConfigManifest {
    /// API version (must be "apphost/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AppHostConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: AppHostConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppHostConfigSpec {
    #[serde(default)]
    pub manifest: ManifestOutputConfig,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOutputConfig {
    /// Manifest path, relative paths are taken from the working directory
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatorConfig {
    /// Address written into allocated endpoint URIs
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,

    /// Inclusive
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,

    /// Bind-test each candidate port before handing it out
    #[serde(default = "default_true")]
    pub probe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_range_start() -> u16 {
    15000
}

fn default_port_range_end() -> u16 {
    15999
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ManifestOutputConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            probe: default_true(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for AppHostConfigManifest {
    fn default() -> Self {
        Self {
            api_version: APP_HOST_CONFIG_API_VERSION.to_string(),
            kind: APP_HOST_CONFIG_KIND.to_string(),
            metadata: ConfigMetadata {
                name: "apphost".to_string(),
                labels: None,
            },
            spec: AppHostConfigSpec::default(),
        }
    }
}

impl AppHostConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. APPHOST_CONFIG_PATH environment variable
    /// 2. ./apphost-config.yaml (working directory)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("APPHOST_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./apphost-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::debug!("No configuration file found. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("APPHOST_MANIFEST_PATH") {
            tracing::info!("Environment override: APPHOST_MANIFEST_PATH={}", val);
            self.spec.manifest.output_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("APPHOST_ALLOCATOR_HOST") {
            tracing::info!("Environment override: APPHOST_ALLOCATOR_HOST={}", val);
            self.spec.allocator.host = val;
        }

        if let Ok(val) = std::env::var("APPHOST_ALLOCATOR_PROBE") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: APPHOST_ALLOCATOR_PROBE=true");
                    self.spec.allocator.probe = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: APPHOST_ALLOCATOR_PROBE=false");
                    self.spec.allocator.probe = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for APPHOST_ALLOCATOR_PROBE: '{}'. \
                         Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != APP_HOST_CONFIG_API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                APP_HOST_CONFIG_API_VERSION
            );
        }

        if self.kind != APP_HOST_CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, APP_HOST_CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.manifest.output_path.as_os_str().is_empty() {
            anyhow::bail!("spec.manifest.outputPath cannot be empty");
        }

        let allocator = &self.spec.allocator;
        if allocator.host.is_empty() {
            anyhow::bail!("spec.allocator.host cannot be empty");
        }
        if allocator.port_range_start == 0
            || allocator.port_range_start > allocator.port_range_end
        {
            anyhow::bail!(
                "Invalid allocator port range {}-{}",
                allocator.port_range_start,
                allocator.port_range_end
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let config = AppHostConfigManifest::default();
        assert_eq!(config.api_version, "apphost/v1");
        assert_eq!(config.kind, "AppHostConfig");
        assert_eq!(config.spec.manifest.output_path, PathBuf::from("manifest.json"));
        assert_eq!(config.spec.allocator.port_range_start, 15000);
        assert_eq!(config.spec.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: apphost/v1
kind: AppHostConfig
metadata:
  name: local
spec:
  allocator:
    portRangeStart: 20000
    portRangeEnd: 20010
"#;
        let config = AppHostConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(config.spec.allocator.port_range_start, 20000);
        assert_eq!(config.spec.allocator.port_range_end, 20010);
        assert_eq!(config.spec.allocator.host, "127.0.0.1");
        assert!(config.spec.allocator.probe);
        assert_eq!(config.spec.manifest.output_path, PathBuf::from("manifest.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = AppHostConfigManifest::default();
        config.kind = "NodeConfig".to_string();
        assert!(config.validate().is_err());

        let mut config = AppHostConfigManifest::default();
        config.spec.allocator.port_range_start = 16000;
        config.spec.allocator.port_range_end = 15000;
        assert!(config.validate().is_err());

        let mut config = AppHostConfigManifest::default();
        config.metadata.name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppHostConfigManifest::load_or_default(Some(dir.path().join("missing.yaml")));
        assert!(result.is_err());
    }
}
