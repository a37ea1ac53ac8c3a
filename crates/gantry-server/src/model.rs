//! Component model types
//!
//! Plain data descriptors for the components a management layer registers
//! against a context. Every model carries the [`ContextModel`] that
//! identifies (and, on first touch, creates) its target context.

use std::sync::Arc;

/// Opaque identity distinguishing one deployed web application from
/// another. Equality and hashing are value-based over the supplied id;
/// the id must be stable for the application's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey(Arc<str>);

impl ContextKey {
    /// Create a key from an application id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().into())
    }

    /// The id as supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity plus mount path of a context.
///
/// Used to locate or lazily create the context; if the context already
/// exists its original mount wins and the model's mount is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextModel {
    /// Context identity
    pub key: ContextKey,
    /// Mount path the context's routes live under
    pub mount: String,
}

impl ContextModel {
    /// Context mounted at the root path
    pub fn new(key: impl Into<ContextKey>) -> Self {
        Self {
            key: key.into(),
            mount: "/".to_string(),
        }
    }

    /// Replace the mount path
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }
}

impl From<&str> for ContextModel {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A servlet registration: a named handler mounted at an alias
#[derive(Debug, Clone)]
pub struct ServletModel {
    /// Target context
    pub context: ContextModel,
    /// Servlet name, unique within the context
    pub name: String,
    /// Absolute alias under the context mount, e.g. `/hello`
    pub alias: String,
}

impl ServletModel {
    /// Create a servlet model
    pub fn new(
        context: impl Into<ContextModel>,
        name: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// A filter registration applying to a set of URL patterns
#[derive(Debug, Clone)]
pub struct FilterModel {
    /// Target context
    pub context: ContextModel,
    /// Filter name, unique within the context
    pub name: String,
    /// URL patterns the filter applies to
    pub patterns: Vec<String>,
}

impl FilterModel {
    /// Create a filter model
    pub fn new(
        context: impl Into<ContextModel>,
        name: impl Into<String>,
        patterns: Vec<String>,
    ) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
            patterns,
        }
    }
}

/// An application event listener registration
#[derive(Debug, Clone)]
pub struct EventListenerModel {
    /// Target context
    pub context: ContextModel,
    /// Listener name, unique within the context
    pub name: String,
}

impl EventListenerModel {
    /// Create an event listener model
    pub fn new(context: impl Into<ContextModel>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
        }
    }
}

/// An error page mapping from a status code or exception name to a location
#[derive(Debug, Clone)]
pub struct ErrorPageModel {
    /// Target context
    pub context: ContextModel,
    /// Status code (`"404"`) or error identifier the page handles
    pub error: String,
    /// Location served for the error
    pub location: String,
}

impl ErrorPageModel {
    /// Create an error page model
    pub fn new(
        context: impl Into<ContextModel>,
        error: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            error: error.into(),
            location: location.into(),
        }
    }
}

/// Welcome files appended to directory requests
#[derive(Debug, Clone)]
pub struct WelcomeFileModel {
    /// Target context
    pub context: ContextModel,
    /// File names, in preference order
    pub files: Vec<String>,
}

impl WelcomeFileModel {
    /// Create a welcome file model
    pub fn new(context: impl Into<ContextModel>, files: Vec<String>) -> Self {
        Self {
            context: context.into(),
            files,
        }
    }
}

/// A security constraint guarding a set of URL patterns
#[derive(Debug, Clone)]
pub struct SecurityConstraintModel {
    /// Target context
    pub context: ContextModel,
    /// Constraint name, unique within the context
    pub name: String,
    /// Guarded URL patterns (exact, or prefix ending in `/*`)
    pub url_patterns: Vec<String>,
    /// Roles permitted through the constraint
    pub roles: Vec<String>,
}

impl SecurityConstraintModel {
    /// Create a security constraint model
    pub fn new(
        context: impl Into<ContextModel>,
        name: impl Into<String>,
        url_patterns: Vec<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
            url_patterns,
            roles,
        }
    }
}

/// A container initializer run when the context is assembled
#[derive(Debug, Clone)]
pub struct ContainerInitializerModel {
    /// Target context
    pub context: ContextModel,
    /// Initializer name, unique within the context
    pub name: String,
}

impl ContainerInitializerModel {
    /// Create a container initializer model
    pub fn new(context: impl Into<ContextModel>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
        }
    }
}
