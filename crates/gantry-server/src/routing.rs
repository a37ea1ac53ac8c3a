//! Shared routing root
//!
//! The dispatch tree all contexts register into and the external HTTP
//! engine queries per request. Reads are lock-free with respect to the
//! controller's administrative lock: an in-flight `resolve` never waits on
//! a context add/remove.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::RegistrationError;
use crate::model::ContextKey;

/// What a route points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Owning context
    pub context: ContextKey,
    /// Servlet name within the context
    pub servlet: String,
}

/// A successful route resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The registered path that matched (longest prefix wins)
    pub path: String,
    /// Route target
    pub target: RouteTarget,
}

/// Concurrent path -> target mapping shared by all contexts
#[derive(Default)]
pub struct RoutingRoot {
    routes: DashMap<String, RouteTarget>,
}

impl RoutingRoot {
    /// Create an empty routing root
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route; the path must be free
    pub(crate) fn register(
        &self,
        path: String,
        target: RouteTarget,
    ) -> Result<(), RegistrationError> {
        match self.routes.entry(path) {
            Entry::Occupied(entry) => Err(RegistrationError::RouteConflict {
                path: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(target);
                Ok(())
            }
        }
    }

    /// Withdraw a route
    pub(crate) fn deregister(&self, path: &str) -> Option<RouteTarget> {
        self.routes.remove(path).map(|(_, target)| target)
    }

    /// Resolve a request path to its longest-prefix route.
    ///
    /// `/a/b/c` matches a route at `/a/b/c`, else `/a/b`, else `/a`,
    /// else `/`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let mut candidate = if path.is_empty() { "/" } else { path };
        loop {
            if let Some(target) = self.routes.get(candidate) {
                return Some(RouteMatch {
                    path: candidate.to_string(),
                    target: target.value().clone(),
                });
            }
            if candidate == "/" {
                return None;
            }
            candidate = match candidate.rfind('/') {
                Some(0) | None => "/",
                Some(idx) => &candidate[..idx],
            };
        }
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether any routes are registered
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(context: &str, servlet: &str) -> RouteTarget {
        RouteTarget {
            context: ContextKey::new(context),
            servlet: servlet.to_string(),
        }
    }

    #[test]
    fn exact_match_wins() {
        let root = RoutingRoot::new();
        root.register("/app".to_string(), target("app", "index"))
            .unwrap();
        root.register("/app/admin".to_string(), target("app", "admin"))
            .unwrap();

        let hit = root.resolve("/app/admin").unwrap();
        assert_eq!(hit.path, "/app/admin");
        assert_eq!(hit.target.servlet, "admin");
    }

    #[test]
    fn longest_prefix_applies() {
        let root = RoutingRoot::new();
        root.register("/app".to_string(), target("app", "index"))
            .unwrap();

        let hit = root.resolve("/app/users/42").unwrap();
        assert_eq!(hit.path, "/app");
        assert_eq!(hit.target.context, ContextKey::new("app"));
    }

    #[test]
    fn root_route_catches_everything() {
        let root = RoutingRoot::new();
        root.register("/".to_string(), target("default", "root"))
            .unwrap();

        assert!(root.resolve("/anything/at/all").is_some());
        assert!(root.resolve("/").is_some());
        assert!(root.resolve("").is_some());
    }

    #[test]
    fn unmatched_path_misses() {
        let root = RoutingRoot::new();
        root.register("/app".to_string(), target("app", "index"))
            .unwrap();

        assert!(root.resolve("/other").is_none());
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        let root = RoutingRoot::new();
        root.register("/app".to_string(), target("a", "one")).unwrap();
        let err = root
            .register("/app".to_string(), target("b", "two"))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::RouteConflict { .. }));
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn deregistered_route_is_unreachable() {
        let root = RoutingRoot::new();
        root.register("/app".to_string(), target("app", "index"))
            .unwrap();
        assert!(root.deregister("/app").is_some());
        assert!(root.resolve("/app").is_none());
        assert!(root.deregister("/app").is_none());
    }
}
