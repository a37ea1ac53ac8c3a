//! Logging configuration and setup
//!
//! Structured logging driven by the `logging` section of the server
//! configuration. `RUST_LOG` overrides the configured level when set.

use gantry_config::{ConfigError, LoggingConfig};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::error::{Result, ServerError};

/// Initialize the global logging subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = FmtSubscriber::builder().with_env_filter(env_filter);
    let installed = match config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        "pretty" => tracing::subscriber::set_global_default(builder.pretty().finish()),
        "compact" => tracing::subscriber::set_global_default(builder.compact().finish()),
        other => {
            return Err(invalid(format!("Unknown log format: {}", other)));
        }
    };
    installed.map_err(|e| invalid(format!("Failed to set logger: {}", e)))?;

    tracing::info!(%level, format = %config.format, "Logging initialized");
    Ok(())
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(invalid(format!("Invalid log level: {}", other))),
    }
}

fn invalid(message: String) -> ServerError {
    ServerError::Config(ConfigError::Validation(message))
}
