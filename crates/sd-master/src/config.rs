//! TOML configuration for the controller and the CLI.

use std::path::{Path, PathBuf};

use sd_engine::{ConfigError, SchedulerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Offline bounce settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub seconds: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { sample_rate: 44_100, seconds: 8.0 }
    }
}

/// Whole-file layout: `[scheduler]`, `[scheduler.diagnostics]` and `[render]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepdeckConfig {
    pub scheduler: SchedulerConfig,
    pub render: RenderConfig,
}

pub fn parse_config(text: &str) -> Result<StepdeckConfig, ConfigLoadError> {
    let config: StepdeckConfig = toml::from_str(text)?;
    config.scheduler.validate()?;
    if config.render.sample_rate == 0 {
        return Err(ConfigError { field: "render.sample_rate", value: 0.0 }.into());
    }
    if !(config.render.seconds > 0.0) {
        return Err(ConfigError { field: "render.seconds", value: config.render.seconds }.into());
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<StepdeckConfig, ConfigLoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigLoadError::Io { path: path.to_path_buf(), source })?;
    parse_config(&text)
}
