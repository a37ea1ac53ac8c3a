//! Engine handle and the connection-handler boundary
//!
//! The binder hands every accepted stream to a [`ConnectionHandler`]
//! supplied by the embedder; protocol framing and request dispatch happen
//! on the other side of that trait.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::debug;

/// Listener protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plaintext HTTP
    Http,
    /// TLS
    Https,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
        }
    }
}

/// One bound listener socket
#[derive(Debug, Clone)]
pub struct BoundAddress {
    /// Protocol served on this socket
    pub scheme: Scheme,
    /// Actual local address (resolved, with the real port for ephemeral binds)
    pub addr: SocketAddr,
}

/// An accepted inbound stream, after the TLS handshake where applicable
pub enum ServerStream {
    /// Plaintext connection
    Plain(TcpStream),
    /// TLS connection
    Tls(Box<tokio_rustls::server::TlsStream<TcpStream>>),
}

impl ServerStream {
    /// Scheme of the listener this stream arrived on
    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Plain(_) => Scheme::Http,
            Self::Tls(_) => Scheme::Https,
        }
    }
}

/// Boundary to the embedder's HTTP engine.
///
/// The accept loops call `handle` once per accepted connection; the
/// implementation owns the stream from then on.
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// Serve one accepted connection
    async fn handle(&self, stream: ServerStream, peer: SocketAddr);
}

/// Handler that closes every connection immediately.
///
/// Stands in for a real HTTP engine in tests and in deployments that are
/// assembled before the engine is wired up.
pub struct DiscardHandler;

#[async_trait]
impl ConnectionHandler for DiscardHandler {
    async fn handle(&self, _stream: ServerStream, peer: SocketAddr) {
        debug!(%peer, "Discarding connection: no engine attached");
    }
}

/// Handle to a running set of listeners.
///
/// Dropping the handle aborts the accept loops, which closes the listener
/// sockets. Per-connection tasks already spawned are left to finish.
#[derive(Debug)]
pub struct EngineHandle {
    bound: Vec<BoundAddress>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub(crate) fn new(bound: Vec<BoundAddress>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { bound, tasks }
    }

    /// Local addresses of all bound listeners, in bind order
    pub fn bound_addresses(&self) -> &[BoundAddress] {
        &self.bound
    }

    /// Stop accepting: abort all accept loops and release the sockets
    pub fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("Engine shut down; {} listeners released", self.bound.len());
        self.bound.clear();
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
