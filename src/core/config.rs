//! Configuration - user file, workspace file, then environment
//!
//! Later layers override earlier ones field by field:
//!
//! 1. `~/.config/qcm/config.yaml` (platform config dir)
//! 2. `.qcm/config.yaml` in the workspace
//! 3. `QCM_SAMPLE_COUNT`, `QCM_PHASE`, `QCM_STORE`, `QCM_INSPECTOR`

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::entities::context::Phase;
use crate::yaml::{parse_yaml_file, YamlError};

pub const DEFAULT_SAMPLE_COUNT: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    File { path: PathBuf, source: YamlError },

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("default_sample_count must be at least 1")]
    InvalidSampleCount,
}

/// Effective settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub default_sample_count: usize,
    pub default_phase: Phase,
    /// Record store path; relative paths resolve against the workspace
    pub store: Option<PathBuf>,
    pub inspector: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_sample_count: DEFAULT_SAMPLE_COUNT,
            default_phase: Phase::default(),
            store: None,
            inspector: None,
        }
    }
}

/// One config source; absent fields leave the lower layer alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub default_sample_count: Option<usize>,
    pub default_phase: Option<Phase>,
    pub store: Option<PathBuf>,
    pub inspector: Option<String>,
}

impl Config {
    /// Load every layer for a workspace root
    pub fn load(workspace: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(path) = Self::user_config_path() {
            config.apply(Self::read_layer(&path)?);
        }
        config.apply(Self::read_layer(&Self::workspace_config_path(workspace))?);
        config.apply(ConfigLayer::from_env(|var| std::env::var(var).ok())?);

        if config.default_sample_count == 0 {
            return Err(ConfigError::InvalidSampleCount);
        }
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "qcm").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn workspace_config_path(workspace: &Path) -> PathBuf {
        workspace.join(".qcm").join("config.yaml")
    }

    fn read_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
        if !path.exists() {
            return Ok(ConfigLayer::default());
        }
        parse_yaml_file(path).map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(count) = layer.default_sample_count {
            self.default_sample_count = count;
        }
        if let Some(phase) = layer.default_phase {
            self.default_phase = phase;
        }
        if layer.store.is_some() {
            self.store = layer.store;
        }
        if layer.inspector.is_some() {
            self.inspector = layer.inspector;
        }
    }

    /// Where committed records are saved
    pub fn store_path(&self, workspace: &Path) -> PathBuf {
        match &self.store {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace.join(path),
            None => workspace.join(".qcm").join("records.db"),
        }
    }
}

impl ConfigLayer {
    /// Build a layer from environment lookups
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut layer = ConfigLayer::default();
        if let Some(value) = lookup("QCM_SAMPLE_COUNT") {
            let count = value.trim().parse::<usize>().map_err(|e| ConfigError::Env {
                var: "QCM_SAMPLE_COUNT",
                message: e.to_string(),
            })?;
            layer.default_sample_count = Some(count);
        }
        if let Some(value) = lookup("QCM_PHASE") {
            let phase = value.parse::<Phase>().map_err(|message| ConfigError::Env {
                var: "QCM_PHASE",
                message,
            })?;
            layer.default_phase = Some(phase);
        }
        layer.store = lookup("QCM_STORE").filter(|v| !v.is_empty()).map(PathBuf::from);
        layer.inspector = lookup("QCM_INSPECTOR").filter(|v| !v.is_empty());
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_sample_count, 5);
        assert_eq!(config.default_phase, Phase::BeforeWash);
        assert_eq!(
            config.store_path(Path::new("/work")),
            PathBuf::from("/work/.qcm/records.db")
        );
    }

    #[test]
    fn test_layers_override_field_by_field() {
        let mut config = Config::default();
        config.apply(ConfigLayer {
            default_sample_count: Some(3),
            inspector: Some("Ana".into()),
            ..ConfigLayer::default()
        });
        config.apply(ConfigLayer {
            default_phase: Some(Phase::AfterWash),
            ..ConfigLayer::default()
        });
        assert_eq!(config.default_sample_count, 3);
        assert_eq!(config.default_phase, Phase::AfterWash);
        assert_eq!(config.inspector.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_env_layer() {
        let layer = ConfigLayer::from_env(env(&[
            ("QCM_SAMPLE_COUNT", "8"),
            ("QCM_PHASE", "after"),
            ("QCM_STORE", "db/qc.db"),
        ]))
        .unwrap();
        assert_eq!(layer.default_sample_count, Some(8));
        assert_eq!(layer.default_phase, Some(Phase::AfterWash));

        let mut config = Config::default();
        config.apply(layer);
        assert_eq!(
            config.store_path(Path::new("/work")),
            PathBuf::from("/work/db/qc.db")
        );
    }

    #[test]
    fn test_env_layer_rejects_bad_count() {
        let err = ConfigLayer::from_env(env(&[("QCM_SAMPLE_COUNT", "many")])).unwrap_err();
        assert!(err.to_string().contains("QCM_SAMPLE_COUNT"));
    }

    #[test]
    fn test_workspace_file_layer() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".qcm")).unwrap();
        std::fs::write(
            Config::workspace_config_path(tmp.path()),
            "default_sample_count: 2\ninspector: Lee\n",
        )
        .unwrap();
        let layer = Config::read_layer(&Config::workspace_config_path(tmp.path())).unwrap();
        assert_eq!(layer.default_sample_count, Some(2));
        assert_eq!(layer.inspector.as_deref(), Some("Lee"));
        assert_eq!(layer.store, None);
    }
}
