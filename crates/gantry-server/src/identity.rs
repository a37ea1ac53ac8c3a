//! Identity manager strategies
//!
//! The capability consulted by security constraints. The strategy set is
//! closed and selected from configuration at `configure` time; all contexts
//! created afterwards share the resolved instance.

use std::collections::HashMap;
use std::sync::Arc;

use gantry_config::IdentityManagerConfig;

/// Authenticates credentials on behalf of security constraints
pub trait IdentityManager: Send + Sync {
    /// Whether the credentials identify a permitted user
    fn authenticate(&self, username: &str, password: &str) -> bool;

    /// Strategy name, for logging
    fn strategy(&self) -> &'static str;
}

/// Accepts any credentials
pub struct AnonymousIdentityManager;

impl IdentityManager for AnonymousIdentityManager {
    fn authenticate(&self, _username: &str, _password: &str) -> bool {
        true
    }

    fn strategy(&self) -> &'static str {
        "anonymous"
    }
}

/// Rejects all credentials
pub struct DenyAllIdentityManager;

impl IdentityManager for DenyAllIdentityManager {
    fn authenticate(&self, _username: &str, _password: &str) -> bool {
        false
    }

    fn strategy(&self) -> &'static str {
        "deny-all"
    }
}

/// Authenticates against a fixed username/password table
pub struct StaticIdentityManager {
    users: HashMap<String, String>,
}

impl StaticIdentityManager {
    /// Create from a username -> password table
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl IdentityManager for StaticIdentityManager {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    fn strategy(&self) -> &'static str {
        "static"
    }
}

/// Resolve the configured strategy into a shared capability
pub fn from_config(config: &IdentityManagerConfig) -> Arc<dyn IdentityManager> {
    match config {
        IdentityManagerConfig::Anonymous => Arc::new(AnonymousIdentityManager),
        IdentityManagerConfig::DenyAll => Arc::new(DenyAllIdentityManager),
        IdentityManagerConfig::Static { users } => {
            Arc::new(StaticIdentityManager::new(users.clone()))
        }
    }
}
