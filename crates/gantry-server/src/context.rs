//! Deployed web application contexts
//!
//! A [`Context`] aggregates one application's routing components under a
//! mount path and registers its servlet routes into the shared routing
//! root. Contexts are created lazily by the registry and destroyed exactly
//! once by explicit removal.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::RegistrationError;
use crate::identity::IdentityManager;
use crate::model::{
    ContainerInitializerModel, ContextKey, ContextModel, ErrorPageModel, EventListenerModel,
    FilterModel, SecurityConstraintModel, ServletModel, WelcomeFileModel,
};
use crate::routing::{RouteTarget, RoutingRoot};

/// Component counts for one context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub servlets: usize,
    pub filters: usize,
    pub event_listeners: usize,
    pub error_pages: usize,
    pub welcome_files: usize,
    pub security_constraints: usize,
    pub container_initializers: usize,
}

#[derive(Default)]
struct ContextInner {
    /// servlet name -> (model, registered route path)
    servlets: HashMap<String, (ServletModel, String)>,
    filters: HashMap<String, FilterModel>,
    event_listeners: HashMap<String, EventListenerModel>,
    /// error id -> model
    error_pages: HashMap<String, ErrorPageModel>,
    welcome_files: Vec<String>,
    security_constraints: HashMap<String, SecurityConstraintModel>,
    container_initializers: HashMap<String, ContainerInitializerModel>,
    destroyed: bool,
}

/// One deployed web application's component aggregate.
///
/// Interior locking is a plain `RwLock` with no awaits under the lock;
/// reads from the dispatch path never touch the controller's admin lock.
pub struct Context {
    key: ContextKey,
    mount: String,
    identity: Arc<dyn IdentityManager>,
    routing: Arc<RoutingRoot>,
    inner: RwLock<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("key", &self.key)
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(
        model: &ContextModel,
        identity: Arc<dyn IdentityManager>,
        routing: Arc<RoutingRoot>,
    ) -> Self {
        debug!(key = %model.key, mount = %model.mount, "Creating context");
        Self {
            key: model.key.clone(),
            mount: model.mount.clone(),
            identity,
            routing,
            inner: RwLock::new(ContextInner::default()),
        }
    }

    /// Context identity
    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    /// Mount path
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Component counts
    pub fn stats(&self) -> ContextStats {
        let inner = self.read();
        ContextStats {
            servlets: inner.servlets.len(),
            filters: inner.filters.len(),
            event_listeners: inner.event_listeners.len(),
            error_pages: inner.error_pages.len(),
            welcome_files: inner.welcome_files.len(),
            security_constraints: inner.security_constraints.len(),
            container_initializers: inner.container_initializers.len(),
        }
    }

    /// Registered servlet names
    pub fn servlet_names(&self) -> Vec<String> {
        self.read().servlets.keys().cloned().collect()
    }

    /// Whether `destroy` has run
    pub fn is_destroyed(&self) -> bool {
        self.read().destroyed
    }

    // ------------------------------------------------------------------
    // Component registration
    // ------------------------------------------------------------------

    pub(crate) fn add_servlet(&self, model: ServletModel) -> Result<(), RegistrationError> {
        let path = self.route_path(&model.alias)?;
        let mut inner = self.write();
        if inner.servlets.contains_key(&model.name) {
            return Err(RegistrationError::Duplicate {
                kind: "servlet",
                name: model.name,
            });
        }
        self.routing.register(
            path.clone(),
            RouteTarget {
                context: self.key.clone(),
                servlet: model.name.clone(),
            },
        )?;
        info!(key = %self.key, servlet = %model.name, %path, "Servlet registered");
        inner.servlets.insert(model.name.clone(), (model, path));
        Ok(())
    }

    pub(crate) fn remove_servlet(&self, model: &ServletModel) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        let (_, path) =
            inner
                .servlets
                .remove(&model.name)
                .ok_or_else(|| RegistrationError::Unknown {
                    kind: "servlet",
                    name: model.name.clone(),
                })?;
        self.routing.deregister(&path);
        info!(key = %self.key, servlet = %model.name, %path, "Servlet removed");
        Ok(())
    }

    pub(crate) fn add_filter(&self, model: FilterModel) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        if inner.filters.contains_key(&model.name) {
            return Err(RegistrationError::Duplicate {
                kind: "filter",
                name: model.name,
            });
        }
        inner.filters.insert(model.name.clone(), model);
        Ok(())
    }

    pub(crate) fn remove_filter(&self, model: &FilterModel) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        inner
            .filters
            .remove(&model.name)
            .map(|_| ())
            .ok_or_else(|| RegistrationError::Unknown {
                kind: "filter",
                name: model.name.clone(),
            })
    }

    pub(crate) fn add_event_listener(
        &self,
        model: EventListenerModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        if inner.event_listeners.contains_key(&model.name) {
            return Err(RegistrationError::Duplicate {
                kind: "event listener",
                name: model.name,
            });
        }
        inner.event_listeners.insert(model.name.clone(), model);
        Ok(())
    }

    pub(crate) fn remove_event_listener(
        &self,
        model: &EventListenerModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        inner
            .event_listeners
            .remove(&model.name)
            .map(|_| ())
            .ok_or_else(|| RegistrationError::Unknown {
                kind: "event listener",
                name: model.name.clone(),
            })
    }

    pub(crate) fn add_error_page(&self, model: ErrorPageModel) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        if inner.error_pages.contains_key(&model.error) {
            return Err(RegistrationError::Duplicate {
                kind: "error page",
                name: model.error,
            });
        }
        inner.error_pages.insert(model.error.clone(), model);
        Ok(())
    }

    pub(crate) fn remove_error_page(
        &self,
        model: &ErrorPageModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        inner
            .error_pages
            .remove(&model.error)
            .map(|_| ())
            .ok_or_else(|| RegistrationError::Unknown {
                kind: "error page",
                name: model.error.clone(),
            })
    }

    pub(crate) fn add_welcome_files(
        &self,
        model: &WelcomeFileModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        for file in &model.files {
            if inner.welcome_files.iter().any(|f| f == file) {
                return Err(RegistrationError::Duplicate {
                    kind: "welcome file",
                    name: file.clone(),
                });
            }
        }
        inner.welcome_files.extend(model.files.iter().cloned());
        Ok(())
    }

    pub(crate) fn remove_welcome_files(
        &self,
        model: &WelcomeFileModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        for file in &model.files {
            if !inner.welcome_files.iter().any(|f| f == file) {
                return Err(RegistrationError::Unknown {
                    kind: "welcome file",
                    name: file.clone(),
                });
            }
        }
        inner.welcome_files.retain(|f| !model.files.contains(f));
        Ok(())
    }

    pub(crate) fn add_security_constraint(
        &self,
        model: SecurityConstraintModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        if inner.security_constraints.contains_key(&model.name) {
            return Err(RegistrationError::Duplicate {
                kind: "security constraint",
                name: model.name,
            });
        }
        inner.security_constraints.insert(model.name.clone(), model);
        Ok(())
    }

    pub(crate) fn remove_security_constraint(
        &self,
        model: &SecurityConstraintModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        inner
            .security_constraints
            .remove(&model.name)
            .map(|_| ())
            .ok_or_else(|| RegistrationError::Unknown {
                kind: "security constraint",
                name: model.name.clone(),
            })
    }

    pub(crate) fn add_container_initializer(
        &self,
        model: ContainerInitializerModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        if inner.container_initializers.contains_key(&model.name) {
            return Err(RegistrationError::Duplicate {
                kind: "container initializer",
                name: model.name,
            });
        }
        inner
            .container_initializers
            .insert(model.name.clone(), model);
        Ok(())
    }

    pub(crate) fn remove_container_initializer(
        &self,
        model: &ContainerInitializerModel,
    ) -> Result<(), RegistrationError> {
        let mut inner = self.write();
        inner
            .container_initializers
            .remove(&model.name)
            .map(|_| ())
            .ok_or_else(|| RegistrationError::Unknown {
                kind: "container initializer",
                name: model.name.clone(),
            })
    }

    // ------------------------------------------------------------------
    // Dispatch-side reads
    // ------------------------------------------------------------------

    /// Whether a request for `path` with the given credentials passes the
    /// context's security constraints. Paths guarded by no constraint are
    /// always permitted.
    pub fn check_access(&self, path: &str, username: &str, password: &str) -> bool {
        let inner = self.read();
        let guarded = inner
            .security_constraints
            .values()
            .any(|c| c.url_patterns.iter().any(|p| pattern_matches(p, path)));
        if !guarded {
            return true;
        }
        self.identity.authenticate(username, password)
    }

    /// Welcome files in preference order
    pub fn welcome_files(&self) -> Vec<String> {
        self.read().welcome_files.clone()
    }

    /// Error page location for a status code or error id
    pub fn error_page(&self, error: &str) -> Option<String> {
        self.read()
            .error_pages
            .get(error)
            .map(|m| m.location.clone())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Withdraw every route and drop all component state.
    ///
    /// Idempotent: a second call is a no-op. The registry's atomic removal
    /// guarantees only one caller ever reaches this through the controller.
    pub fn destroy(&self) {
        let mut inner = self.write();
        if inner.destroyed {
            return;
        }
        for (_, (_, path)) in inner.servlets.drain() {
            self.routing.deregister(&path);
        }
        inner.filters.clear();
        inner.event_listeners.clear();
        inner.error_pages.clear();
        inner.welcome_files.clear();
        inner.security_constraints.clear();
        inner.container_initializers.clear();
        inner.destroyed = true;
        info!(key = %self.key, "Context destroyed");
    }

    // ------------------------------------------------------------------

    fn route_path(&self, alias: &str) -> Result<String, RegistrationError> {
        if !alias.starts_with('/') {
            return Err(RegistrationError::InvalidAlias {
                alias: alias.to_string(),
            });
        }
        let mount = self.mount.trim_end_matches('/');
        if alias == "/" {
            return Ok(if mount.is_empty() {
                "/".to_string()
            } else {
                mount.to_string()
            });
        }
        Ok(format!("{}{}", mount, alias))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ContextInner> {
        self.inner.read().expect("context lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ContextInner> {
        self.inner.write().expect("context lock poisoned")
    }
}

/// Servlet-style pattern match: exact, or prefix when the pattern ends in
/// `/*`.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/*") {
        path == prefix || path.starts_with(&format!("{}/", prefix))
    } else {
        pattern == path
    }
}
