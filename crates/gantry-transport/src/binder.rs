//! Listener binder
//!
//! Binds the configured address/port/protocol combinations and spawns one
//! accept loop per socket. Binding order follows the address list; within
//! one address HTTP is bound before HTTPS. Every socket is bound before any
//! accept loop starts, so a failed bind leaves nothing running: the
//! already-bound sockets are simply dropped on the error path.

use std::net::SocketAddr;
use std::sync::Arc;

use gantry_config::NetworkConfig;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

use crate::engine::{BoundAddress, ConnectionHandler, EngineHandle, Scheme, ServerStream};
use crate::{Result, TransportError};

/// Bind all configured listeners and start accepting.
///
/// Requires TLS material when HTTPS is enabled; the caller builds it first
/// so a TLS failure aborts the start before any socket is touched.
pub async fn bind(
    network: &NetworkConfig,
    tls: Option<Arc<ServerConfig>>,
    handler: Arc<dyn ConnectionHandler>,
) -> Result<EngineHandle> {
    if network.https_enabled && tls.is_none() {
        return Err(TransportError::configuration(
            "HTTPS is enabled but no TLS material was supplied",
        ));
    }

    let mut listeners: Vec<(Scheme, TcpListener, SocketAddr)> = Vec::new();

    for address in &network.addresses {
        if network.http_enabled {
            let listener = bind_socket(address, network.http_port).await?;
            let local = listener.local_addr().map_err(TransportError::Io)?;
            info!(scheme = %Scheme::Http, %local, "Listener bound");
            listeners.push((Scheme::Http, listener, local));
        }
        if network.https_enabled {
            let listener = bind_socket(address, network.https_port).await?;
            let local = listener.local_addr().map_err(TransportError::Io)?;
            info!(scheme = %Scheme::Https, %local, "Listener bound");
            listeners.push((Scheme::Https, listener, local));
        }
    }

    // All sockets are bound; only now do accept loops start.
    let mut bound = Vec::with_capacity(listeners.len());
    let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(listeners.len());
    for (scheme, listener, local) in listeners {
        bound.push(BoundAddress {
            scheme,
            addr: local,
        });
        let acceptor = match scheme {
            Scheme::Https => tls.clone().map(TlsAcceptor::from),
            Scheme::Http => None,
        };
        tasks.push(tokio::spawn(accept_loop(
            listener,
            acceptor,
            handler.clone(),
        )));
    }

    Ok(EngineHandle::new(bound, tasks))
}

async fn bind_socket(address: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{}:{}", address, port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| TransportError::bind(addr, e))
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    handler: Arc<dyn ConnectionHandler>,
) {
    loop {
        match listener.accept().await {
            Ok((tcp_stream, peer_addr)) => {
                debug!(%peer_addr, "Accepted connection");

                if let Some(ref acceptor) = acceptor {
                    let acceptor = acceptor.clone();
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        match acceptor.accept(tcp_stream).await {
                            Ok(tls_stream) => {
                                handler
                                    .handle(ServerStream::Tls(Box::new(tls_stream)), peer_addr)
                                    .await;
                            }
                            Err(e) => {
                                error!(%peer_addr, error = %e, "TLS handshake failed");
                            }
                        }
                    });
                } else {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler.handle(ServerStream::Plain(tcp_stream), peer_addr).await;
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                // Keep listening despite transient accept errors
            }
        }
    }
}
