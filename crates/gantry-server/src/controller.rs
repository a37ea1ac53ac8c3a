//! Server controller state machine
//!
//! Owns the lifecycle (`Unconfigured -> Stopped <-> Started`), the context
//! registry, the shared routing root, and the live network bindings. Every
//! administrative operation runs under one exclusive lock so transitions
//! are atomic with respect to other controller calls; request dispatch
//! never takes this lock.

use std::sync::Arc;

use gantry_config::{Locator, ServerConfiguration};
use gantry_transport::{
    bind, build_server_tls, BoundAddress, ConnectionHandler, DiscardHandler, EngineHandle,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{RegistrationError, Result, ServerError};
use crate::events::{ListenerSet, ServerEvent, ServerListener};
use crate::identity::{self, IdentityManager};
use crate::model::{
    ContainerInitializerModel, ContextKey, ContextModel, ErrorPageModel, EventListenerModel,
    FilterModel, SecurityConstraintModel, ServletModel, WelcomeFileModel,
};
use crate::registry::ContextRegistry;
use crate::routing::RoutingRoot;

/// Controller lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No configuration has been supplied yet
    Unconfigured,
    /// Configured but not accepting connections
    Stopped,
    /// Accepting connections
    Started,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("Unconfigured"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Started => f.write_str("Started"),
        }
    }
}

struct ControllerInner {
    state: ServerState,
    config: Option<ServerConfiguration>,
    identity: Arc<dyn IdentityManager>,
    engine: Option<EngineHandle>,
}

/// The server controller.
///
/// Reusable indefinitely: there is no terminal state. Multiple independent
/// controllers may coexist in one process; nothing here is global.
pub struct ServerController {
    inner: Mutex<ControllerInner>,
    listeners: ListenerSet,
    routing: Arc<RoutingRoot>,
    registry: ContextRegistry,
    handler: Arc<dyn ConnectionHandler>,
}

impl ServerController {
    /// Controller with no engine attached; accepted connections are
    /// dropped until a real handler is wired in via [`Self::with_handler`]
    pub fn new() -> Self {
        Self::with_handler(Arc::new(DiscardHandler))
    }

    /// Controller dispatching accepted connections to the given handler
    pub fn with_handler(handler: Arc<dyn ConnectionHandler>) -> Self {
        Self {
            inner: Mutex::new(ControllerInner {
                state: ServerState::Unconfigured,
                config: None,
                identity: identity::from_config(&Default::default()),
                engine: None,
            }),
            listeners: ListenerSet::new(),
            routing: Arc::new(RoutingRoot::new()),
            registry: ContextRegistry::new(),
            handler,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Supply or replace the configuration.
    ///
    /// First call moves the controller to `Stopped` and emits
    /// [`ServerEvent::Configured`]. While `Started`, the network bindings
    /// are torn down and rebuilt with the new configuration; the state
    /// stays `Started` and no event is emitted, but if the rebuild fails
    /// the server ends up `Stopped` and [`ServerEvent::Stopped`] is
    /// emitted. While `Stopped`, the configuration is stored for the next
    /// `start`.
    pub async fn configure(&self, config: ServerConfiguration) -> Result<()> {
        config
            .validate()
            .map_err(|e| ServerError::InvalidArgument(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        debug!(state = %inner.state, "Configuring server");

        inner.identity = identity::from_config(&config.identity);
        inner.config = Some(config);

        match inner.state {
            ServerState::Unconfigured => {
                inner.state = ServerState::Stopped;
                self.listeners.notify(ServerEvent::Configured);
            }
            ServerState::Started => {
                self.do_stop(&mut inner);
                if let Err(e) = self.do_start(&mut inner).await {
                    // The old engine is gone and the new one failed to
                    // come up; claiming Started would be a lie.
                    inner.state = ServerState::Stopped;
                    self.listeners.notify(ServerEvent::Stopped);
                    return Err(e);
                }
            }
            ServerState::Stopped => {}
        }
        Ok(())
    }

    /// Open the network: build TLS material, bind every listener, start
    /// accepting. Emits [`ServerEvent::Started`].
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        debug!(state = %inner.state, "Starting server");
        Self::assert_state(&inner, ServerState::Stopped)?;

        self.do_start(&mut inner).await?;
        inner.state = ServerState::Started;
        self.listeners.notify(ServerEvent::Started);
        Ok(())
    }

    /// Close the network, preserving all registered contexts for a future
    /// `start`. Emits [`ServerEvent::Stopped`] even when the server was
    /// already stopped.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        debug!(state = %inner.state, "Stopping server");
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;

        if inner.state == ServerState::Started {
            self.do_stop(&mut inner);
            inner.state = ServerState::Stopped;
        }
        self.listeners.notify(ServerEvent::Stopped);
        Ok(())
    }

    /// Whether the server is accepting connections
    pub async fn is_started(&self) -> bool {
        self.inner.lock().await.state == ServerState::Started
    }

    /// Whether a configuration has been supplied
    pub async fn is_configured(&self) -> bool {
        self.inner.lock().await.state != ServerState::Unconfigured
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ServerState {
        self.inner.lock().await.state
    }

    /// The configured HTTP port
    pub async fn http_port(&self) -> Result<u16> {
        let inner = self.inner.lock().await;
        let config = inner.config.as_ref().ok_or(ServerError::NotConfigured)?;
        Ok(config.network.http_port)
    }

    /// The configured HTTPS port
    pub async fn https_port(&self) -> Result<u16> {
        let inner = self.inner.lock().await;
        let config = inner.config.as_ref().ok_or(ServerError::NotConfigured)?;
        Ok(config.network.https_port)
    }

    /// Actual bound listener addresses; empty unless `Started`
    pub async fn bound_addresses(&self) -> Vec<BoundAddress> {
        let inner = self.inner.lock().await;
        inner
            .engine
            .as_ref()
            .map(|e| e.bound_addresses().to_vec())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Lifecycle observers
    // ------------------------------------------------------------------

    /// Register a lifecycle observer; duplicate registration is a no-op
    pub fn add_listener(&self, listener: Arc<dyn ServerListener>) {
        self.listeners.add(listener);
    }

    /// Deregister a lifecycle observer
    pub fn remove_listener(&self, listener: &Arc<dyn ServerListener>) {
        self.listeners.remove(listener);
    }

    // ------------------------------------------------------------------
    // Contexts
    // ------------------------------------------------------------------

    /// The shared routing root the embedder's engine resolves requests
    /// against
    pub fn routing_root(&self) -> Arc<RoutingRoot> {
        self.routing.clone()
    }

    /// Registry introspection
    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Locate or create the context for `model`
    pub async fn get_context(&self, model: &ContextModel) -> Result<Arc<Context>> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        Ok(self.find_or_create(&inner, model))
    }

    /// Remove and destroy the context for `key`.
    ///
    /// The removal is atomic and the destruction runs exactly once; a
    /// second call for the same key fails with `NotFound`.
    pub async fn remove_context(&self, key: &ContextKey) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;

        let context = self.registry.remove(key)?;
        context.destroy();
        info!(%key, "Context removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Component mutation
    //
    // All of these are legal in both Stopped and Started: an application
    // can be assembled before the network opens, and hot deployment never
    // requires a restart. Only `configure` rebinds sockets.
    // ------------------------------------------------------------------

    /// Register a servlet, exposing its route immediately
    pub async fn add_servlet(&self, model: ServletModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_servlet(model)
            .map_err(|e| Self::registration("add", "servlet", key, e))
    }

    /// Remove a servlet and withdraw its route
    pub async fn remove_servlet(&self, model: &ServletModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for servlet removal; skipping");
            return Ok(());
        };
        context
            .remove_servlet(model)
            .map_err(|e| Self::registration("remove", "servlet", model.context.key.clone(), e))
    }

    /// Register a filter
    pub async fn add_filter(&self, model: FilterModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_filter(model)
            .map_err(|e| Self::registration("add", "filter", key, e))
    }

    /// Remove a filter
    pub async fn remove_filter(&self, model: &FilterModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for filter removal; skipping");
            return Ok(());
        };
        context
            .remove_filter(model)
            .map_err(|e| Self::registration("remove", "filter", model.context.key.clone(), e))
    }

    /// Register an application event listener
    pub async fn add_event_listener(&self, model: EventListenerModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_event_listener(model)
            .map_err(|e| Self::registration("add", "event listener", key, e))
    }

    /// Remove an application event listener
    pub async fn remove_event_listener(&self, model: &EventListenerModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for listener removal; skipping");
            return Ok(());
        };
        context.remove_event_listener(model).map_err(|e| {
            Self::registration("remove", "event listener", model.context.key.clone(), e)
        })
    }

    /// Register an error page mapping
    pub async fn add_error_page(&self, model: ErrorPageModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_error_page(model)
            .map_err(|e| Self::registration("add", "error page", key, e))
    }

    /// Remove an error page mapping
    pub async fn remove_error_page(&self, model: &ErrorPageModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for error page removal; skipping");
            return Ok(());
        };
        context
            .remove_error_page(model)
            .map_err(|e| Self::registration("remove", "error page", model.context.key.clone(), e))
    }

    /// Append welcome files
    pub async fn add_welcome_files(&self, model: &WelcomeFileModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        context
            .add_welcome_files(model)
            .map_err(|e| Self::registration("add", "welcome files", model.context.key.clone(), e))
    }

    /// Remove welcome files
    pub async fn remove_welcome_files(&self, model: &WelcomeFileModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for welcome file removal; skipping");
            return Ok(());
        };
        context.remove_welcome_files(model).map_err(|e| {
            Self::registration("remove", "welcome files", model.context.key.clone(), e)
        })
    }

    /// Register a security constraint
    pub async fn add_security_constraint(&self, model: SecurityConstraintModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_security_constraint(model)
            .map_err(|e| Self::registration("add", "security constraint", key, e))
    }

    /// Remove a security constraint
    pub async fn remove_security_constraint(&self, model: &SecurityConstraintModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for constraint removal; skipping");
            return Ok(());
        };
        context.remove_security_constraint(model).map_err(|e| {
            Self::registration("remove", "security constraint", model.context.key.clone(), e)
        })
    }

    /// Register a container initializer
    pub async fn add_container_initializer(&self, model: ContainerInitializerModel) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let context = self.find_or_create(&inner, &model.context);
        let key = model.context.key.clone();
        context
            .add_container_initializer(model)
            .map_err(|e| Self::registration("add", "container initializer", key, e))
    }

    /// Remove a container initializer
    pub async fn remove_container_initializer(
        &self,
        model: &ContainerInitializerModel,
    ) -> Result<()> {
        let inner = self.inner.lock().await;
        Self::assert_not_state(&inner, ServerState::Unconfigured)?;
        let Some(context) = self.registry.find(&model.context.key) else {
            debug!(key = %model.context.key, "No context for initializer removal; skipping");
            return Ok(());
        };
        context.remove_container_initializer(model).map_err(|e| {
            Self::registration("remove", "container initializer", model.context.key.clone(), e)
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn do_start(&self, inner: &mut ControllerInner) -> Result<()> {
        let config = inner
            .config
            .as_ref()
            .ok_or(ServerError::NotConfigured)?
            .clone();

        let tls = if config.network.https_enabled {
            let keystore = config
                .tls
                .keystore
                .as_deref()
                .ok_or_else(|| ServerError::InvalidArgument("tls.keystore missing".into()))?;
            let locator = Locator::resolve(keystore)?;
            let material = build_server_tls(
                &locator,
                config.tls.keystore_format,
                config.tls.key_password.as_deref(),
                config.tls.store_password.as_deref(),
            )
            .map_err(ServerError::Tls)?;
            Some(material)
        } else {
            None
        };

        let engine = bind(&config.network, tls, self.handler.clone())
            .await
            .map_err(ServerError::Bind)?;

        for bound in engine.bound_addresses() {
            info!(scheme = %bound.scheme, addr = %bound.addr, "Server listening");
        }
        inner.engine = Some(engine);
        Ok(())
    }

    fn do_stop(&self, inner: &mut ControllerInner) {
        if let Some(engine) = inner.engine.take() {
            engine.shutdown();
            info!("Network bindings released");
        }
    }

    fn find_or_create(&self, inner: &ControllerInner, model: &ContextModel) -> Arc<Context> {
        self.registry
            .find_or_create(model, inner.identity.clone(), self.routing.clone())
    }

    fn assert_state(inner: &ControllerInner, expected: ServerState) -> Result<()> {
        if inner.state != expected {
            return Err(ServerError::IllegalState(format!(
                "State is {} but should be {}",
                inner.state, expected
            )));
        }
        Ok(())
    }

    fn assert_not_state(inner: &ControllerInner, forbidden: ServerState) -> Result<()> {
        if inner.state == forbidden {
            return Err(ServerError::IllegalState(format!(
                "State should not be {}",
                inner.state
            )));
        }
        Ok(())
    }

    fn registration(
        action: &'static str,
        component: &'static str,
        key: ContextKey,
        source: RegistrationError,
    ) -> ServerError {
        ServerError::Registration {
            action,
            component,
            key,
            source,
        }
    }
}

impl Default for ServerController {
    fn default() -> Self {
        Self::new()
    }
}
