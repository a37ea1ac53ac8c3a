//! Configuration loading and parsing

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, Result, ServerConfiguration};

/// Configuration loader with support for files and environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ServerConfiguration> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Configuration file not found: {}", path.display()),
            )));
        }

        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config: ServerConfiguration = toml::from_str(&content).map_err(ConfigError::Toml)?;

        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<ServerConfiguration> {
        let mut config = ServerConfiguration::default();
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with file fallback to environment
    pub fn load() -> Result<ServerConfiguration> {
        let config_paths = [
            "gantry.toml",
            "config/gantry.toml",
            "/etc/gantry/server.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        if let Ok(config_file) = env::var("GANTRY_CONFIG_FILE") {
            return Self::from_file(config_file);
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut ServerConfiguration) -> Result<()> {
        if let Ok(addresses) = env::var("GANTRY_ADDRESSES") {
            config.network.addresses = addresses
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(http_enabled) = env::var("GANTRY_HTTP_ENABLED") {
            config.network.http_enabled = http_enabled
                .parse()
                .map_err(|e| ConfigError::Environment(format!("Invalid GANTRY_HTTP_ENABLED: {}", e)))?;
        }

        if let Ok(http_port) = env::var("GANTRY_HTTP_PORT") {
            config.network.http_port = http_port
                .parse()
                .map_err(|e| ConfigError::Environment(format!("Invalid GANTRY_HTTP_PORT: {}", e)))?;
        }

        if let Ok(https_enabled) = env::var("GANTRY_HTTPS_ENABLED") {
            config.network.https_enabled = https_enabled.parse().map_err(|e| {
                ConfigError::Environment(format!("Invalid GANTRY_HTTPS_ENABLED: {}", e))
            })?;
        }

        if let Ok(https_port) = env::var("GANTRY_HTTPS_PORT") {
            config.network.https_port = https_port
                .parse()
                .map_err(|e| ConfigError::Environment(format!("Invalid GANTRY_HTTPS_PORT: {}", e)))?;
        }

        if let Ok(keystore) = env::var("GANTRY_KEYSTORE") {
            config.tls.keystore = Some(keystore);
        }

        if let Ok(key_password) = env::var("GANTRY_KEY_PASSWORD") {
            config.tls.key_password = Some(key_password);
        }

        if let Ok(store_password) = env::var("GANTRY_STORE_PASSWORD") {
            config.tls.store_password = Some(store_password);
        }

        if let Ok(log_level) = env::var("GANTRY_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(log_format) = env::var("GANTRY_LOG_FORMAT") {
            config.logging.format = log_format;
        }

        Ok(())
    }
}
