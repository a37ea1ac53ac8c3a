//! Server configuration structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::{ConfigError, Result};

/// Complete server controller configuration.
///
/// The controller treats one of these as an immutable snapshot: `configure`
/// replaces the held reference wholesale and never mutates it in place.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfiguration {
    /// Network configuration
    pub network: NetworkConfig,
    /// TLS configuration
    pub tls: TlsConfig,
    /// Identity manager selection
    pub identity: IdentityManagerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Ordered list of addresses to listen on
    pub addresses: Vec<String>,
    /// Accept plaintext HTTP connections
    pub http_enabled: bool,
    /// Plaintext HTTP port
    pub http_port: u16,
    /// Accept TLS connections
    pub https_enabled: bool,
    /// TLS port
    pub https_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["0.0.0.0".to_string()],
            http_enabled: true,
            http_port: 8080,
            https_enabled: false,
            https_port: 8443,
        }
    }
}

/// Keystore format for the TLS material builder.
///
/// Closed set: a PEM bundle holds the certificate chain and the private key
/// in a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreFormat {
    /// PEM bundle (certificate chain + private key)
    #[default]
    Pem,
}

/// TLS configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Keystore locator (file path or absolute URL)
    pub keystore: Option<String>,
    /// Keystore format
    pub keystore_format: KeystoreFormat,
    /// Private key password (reserved for encrypted keys)
    pub key_password: Option<String>,
    /// Keystore password (reserved for encrypted keys)
    pub store_password: Option<String>,
}

/// Identity manager strategy, resolved at configure time.
///
/// The strategy set is closed and statically known; no runtime class
/// loading is involved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum IdentityManagerConfig {
    /// Accept any credentials
    #[default]
    Anonymous,
    /// Reject all credentials
    DenyAll,
    /// Fixed username/password table
    Static {
        /// username -> password
        users: HashMap<String, String>,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ServerConfiguration {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.network.addresses.is_empty() {
            return Err(ConfigError::MissingRequired(
                "network.addresses must contain at least one address".to_string(),
            ));
        }

        for address in &self.network.addresses {
            if address.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "network.addresses".to_string(),
                    message: "Address cannot be empty".to_string(),
                });
            }
            // Hostnames are resolved at bind time; IP literals are checked here
            if address.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ':')
                && address.parse::<IpAddr>().is_err()
            {
                return Err(ConfigError::InvalidValue {
                    field: "network.addresses".to_string(),
                    message: format!("Invalid IP address: {}", address),
                });
            }
        }

        if self.network.http_enabled && self.network.http_port == 0 {
            // Port 0 requests an ephemeral port, which is fine for tests but
            // is only accepted with a single listening address, since every
            // address would otherwise be bound to a different port.
            if self.network.addresses.len() > 1 {
                return Err(ConfigError::InvalidValue {
                    field: "network.http_port".to_string(),
                    message: "Ephemeral port 0 requires a single listening address".to_string(),
                });
            }
        }

        if self.network.https_enabled {
            if self.tls.keystore.is_none() {
                return Err(ConfigError::MissingRequired(
                    "tls.keystore is required when HTTPS is enabled".to_string(),
                ));
            }
            if self.network.https_port == 0 && self.network.addresses.len() > 1 {
                return Err(ConfigError::InvalidValue {
                    field: "network.https_port".to_string(),
                    message: "Ephemeral port 0 requires a single listening address".to_string(),
                });
            }
        }

        if self.tls.store_password.is_some() && self.tls.keystore.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "tls.store_password".to_string(),
                message: "Password given without a keystore".to_string(),
            });
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.level".to_string(),
                    message: "Must be one of: trace, debug, info, warn, error".to_string(),
                });
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.format".to_string(),
                    message: "Must be one of: json, pretty, compact".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        let config = ServerConfiguration::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn https_without_keystore_is_rejected() {
        let mut config = ServerConfiguration::default();
        config.network.https_enabled = true;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn empty_address_list_is_rejected() {
        let mut config = ServerConfiguration::default();
        config.network.addresses.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_ip_literal_is_rejected() {
        let mut config = ServerConfiguration::default();
        config.network.addresses = vec!["256.1.1.1".to_string()];
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn ephemeral_port_requires_single_address() {
        let mut config = ServerConfiguration::default();
        config.network.addresses = vec!["127.0.0.1".to_string(), "0.0.0.0".to_string()];
        config.network.http_port = 0;
        assert!(config.validate().is_err());

        config.network.addresses = vec!["127.0.0.1".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut config = ServerConfiguration::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
