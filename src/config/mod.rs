mod logging_config;
mod pipeline_config;
pub mod config;

pub use config::{Config, ConfigError};
pub use logging_config::LoggingConfig;
pub use pipeline_config::PipelineConfig;

/// HTTP client settings for loading steps.
pub type LoaderConfig = pipekit_fetch::FetchConfig;
