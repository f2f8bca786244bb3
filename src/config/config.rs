use crate::config::{LoaderConfig, LoggingConfig, PipelineConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid pipeline '{name}': {reason}")]
    InvalidPipeline { name: String, reason: String },
    #[error("Invalid logging config: {0}")]
    InvalidLogging(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub loader: LoaderConfig,
    pub pipelines: HashMap<String, PipelineConfig>,
}

impl Config {
    /// Load and validate a TOML config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded config from {} ({} pipelines)",
            path.display(),
            config.pipelines.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        for (name, pipeline) in &self.pipelines {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidPipeline {
                    name: name.clone(),
                    reason: "pipeline names must not be empty".to_string(),
                });
            }
            pipeline.validate(name)?;
        }
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipelines.get(name)
    }
}
