//! Server controller error types

use gantry_transport::TransportError;
use thiserror::Error;

use crate::model::ContextKey;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server controller errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Required input was missing or rejected by validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation invoked in a state that forbids it
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Port queries before `configure`
    #[error("Server is not configured")]
    NotConfigured,

    /// TLS material could not be built; fatal to the start attempt
    #[error("Unable to build TLS context: {0}")]
    Tls(#[source] TransportError),

    /// A listener could not be bound; fatal to the start attempt
    #[error("Unable to bind listeners: {0}")]
    Bind(#[source] TransportError),

    /// A component registration against a context failed
    #[error("Unable to {action} {component} for context {key}: {source}")]
    Registration {
        /// "add" or "remove"
        action: &'static str,
        /// Component kind, e.g. "servlet"
        component: &'static str,
        /// Context the operation targeted
        key: ContextKey,
        /// Underlying failure
        #[source]
        source: RegistrationError,
    },

    /// `remove_context` on an absent key
    #[error("No context registered for key {0}")]
    NotFound(ContextKey),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] gantry_config::ConfigError),
}

/// Underlying failures while mutating a context's component set
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The route path is already taken, by this or another context
    #[error("route {path} is already registered")]
    RouteConflict {
        /// Conflicting route path
        path: String,
    },

    /// Servlet aliases must be absolute paths
    #[error("invalid alias {alias:?}: must start with '/'")]
    InvalidAlias {
        /// The rejected alias
        alias: String,
    },

    /// The component is already present in this context
    #[error("{kind} {name:?} is already registered")]
    Duplicate {
        /// Component kind
        kind: &'static str,
        /// Component name
        name: String,
    },

    /// The component was never added to this context
    #[error("{kind} {name:?} is not registered")]
    Unknown {
        /// Component kind
        kind: &'static str,
        /// Component name
        name: String,
    },
}
