//! Gantry Transport Layer
//!
//! TLS material assembly and network listener binding for the gantry
//! server controller. Request dispatch itself belongs to the embedder's
//! HTTP engine, reached through the [`ConnectionHandler`] boundary.

pub mod binder;
pub mod engine;
pub mod error;
pub mod tls;

pub use binder::bind;
pub use engine::{
    BoundAddress, ConnectionHandler, DiscardHandler, EngineHandle, Scheme, ServerStream,
};
pub use error::{Result, TransportError};
pub use tls::build_server_tls;
