//! Concurrent context registry
//!
//! One live [`Context`] per key. Creation uses the map's atomic
//! insert-if-absent, so concurrent first-touch registration for the same
//! key yields a single instance and lookups for other keys never wait on
//! an unrelated creation.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::context::Context;
use crate::error::{Result, ServerError};
use crate::identity::IdentityManager;
use crate::model::{ContextKey, ContextModel};
use crate::routing::RoutingRoot;

/// Registry of live contexts, keyed by application identity
#[derive(Default)]
pub struct ContextRegistry {
    contexts: DashMap<ContextKey, Arc<Context>>,
}

impl ContextRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the context for the model's key, creating it if absent.
    ///
    /// Creation and insertion are atomic: of N concurrent callers with the
    /// same key, exactly one context is constructed and all N receive it.
    /// A freshly created context is bound to the supplied identity manager
    /// and routing root; an existing one keeps those it was created with.
    pub fn find_or_create(
        &self,
        model: &ContextModel,
        identity: Arc<dyn IdentityManager>,
        routing: Arc<RoutingRoot>,
    ) -> Arc<Context> {
        self.contexts
            .entry(model.key.clone())
            .or_insert_with(|| Arc::new(Context::new(model, identity, routing)))
            .value()
            .clone()
    }

    /// Pure lookup; never creates
    pub fn find(&self, key: &ContextKey) -> Option<Arc<Context>> {
        self.contexts.get(key).map(|entry| entry.value().clone())
    }

    /// Atomically remove the context for `key`.
    ///
    /// The caller must invoke the returned context's teardown; the registry
    /// no longer references it.
    pub fn remove(&self, key: &ContextKey) -> Result<Arc<Context>> {
        let (_, context) = self
            .contexts
            .remove(key)
            .ok_or_else(|| ServerError::NotFound(key.clone()))?;
        debug!(%key, "Context removed from registry");
        Ok(context)
    }

    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no contexts are registered
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Keys of all live contexts
    pub fn keys(&self) -> Vec<ContextKey> {
        self.contexts.iter().map(|e| e.key().clone()).collect()
    }
}
