//! Gantry Configuration Management
//!
//! Provides configuration loading, parsing, and validation for the gantry
//! server controller.

pub mod error;
pub mod loader;
pub mod resource;
pub mod server;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use resource::Locator;
pub use server::{
    IdentityManagerConfig, KeystoreFormat, LoggingConfig, NetworkConfig, ServerConfiguration,
    TlsConfig,
};
