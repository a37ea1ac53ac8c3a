//! Gantry Server
//!
//! Embeddable HTTP/HTTPS server controller: lifecycle state machine,
//! concurrent context registry, and the component registration API
//! that feeds the routing root.

pub mod context;
pub mod controller;
pub mod error;
pub mod events;
pub mod identity;
pub mod logging;
pub mod model;
pub mod registry;
pub mod routing;

pub use context::{Context, ContextStats};
pub use controller::{ServerController, ServerState};
pub use error::{RegistrationError, Result, ServerError};
pub use events::{ListenerSet, ServerEvent, ServerListener};
pub use identity::{
    from_config as identity_from_config, AnonymousIdentityManager, DenyAllIdentityManager,
    IdentityManager, StaticIdentityManager,
};
pub use logging::init_logging;
pub use model::{
    ContainerInitializerModel, ContextKey, ContextModel, ErrorPageModel, EventListenerModel,
    FilterModel, SecurityConstraintModel, ServletModel, WelcomeFileModel,
};
pub use registry::ContextRegistry;
pub use routing::{RouteMatch, RouteTarget, RoutingRoot};
