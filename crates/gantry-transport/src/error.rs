//! Transport layer errors

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// TLS material could not be assembled
    #[error("TLS error: {message}")]
    Tls {
        /// What failed
        message: String,
    },

    /// A listener socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// The address:port that failed
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Inconsistent binder input
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was inconsistent
        message: String,
    },

    /// IO errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a TLS error
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a bind error for the given address
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}
