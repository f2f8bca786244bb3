use crate::config::LoggingConfig;
use std::fs::File;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to initialize logging: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber: stdout always, plus a file when configured.
///
/// `RUST_LOG` takes precedence over `log_level`. Fails if a global subscriber
/// is already set.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)?,
    };

    let file_layer = if config.log_to_file {
        let file = File::create(&config.log_file_path).map_err(|source| LoggingError::File {
            path: config.log_file_path.clone(),
            source,
        })?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!("Logging initialised at '{}'", config.log_level);
    Ok(())
}
