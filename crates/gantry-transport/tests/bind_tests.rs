//! Listener binder integration tests
//!
//! Binds real sockets on 127.0.0.1 with ephemeral ports and drives them
//! with real client connections.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gantry_config::{KeystoreFormat, Locator, NetworkConfig};
use gantry_transport::{bind, build_server_tls, ConnectionHandler, Scheme, ServerStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

// ============================================================================
// Test plumbing
// ============================================================================

struct RecordingHandler {
    tx: mpsc::UnboundedSender<(Scheme, SocketAddr)>,
}

#[async_trait]
impl ConnectionHandler for RecordingHandler {
    async fn handle(&self, stream: ServerStream, peer: SocketAddr) {
        let _ = self.tx.send((stream.scheme(), peer));
    }
}

fn recording_handler() -> (
    Arc<dyn ConnectionHandler>,
    mpsc::UnboundedReceiver<(Scheme, SocketAddr)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingHandler { tx }), rx)
}

fn loopback_http() -> NetworkConfig {
    NetworkConfig {
        addresses: vec!["127.0.0.1".to_string()],
        http_enabled: true,
        http_port: 0,
        https_enabled: false,
        https_port: 0,
    }
}

async fn recv_connection(
    rx: &mut mpsc::UnboundedReceiver<(Scheme, SocketAddr)>,
) -> (Scheme, SocketAddr) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("handler channel closed")
}

// ============================================================================
// Plaintext binding
// ============================================================================

#[tokio::test]
async fn accepted_connection_reaches_handler() {
    let (handler, mut rx) = recording_handler();
    let engine = bind(&loopback_http(), None, handler).await.expect("bind");

    let bound = engine.bound_addresses();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].scheme, Scheme::Http);
    assert_ne!(bound[0].addr.port(), 0, "ephemeral port should be resolved");

    let _client = TcpStream::connect(bound[0].addr).await.expect("connect");
    let (scheme, _peer) = recv_connection(&mut rx).await;
    assert_eq!(scheme, Scheme::Http);

    engine.shutdown();
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    // Occupy a port, then ask the binder for it.
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_port = taken.local_addr().unwrap().port();

    let mut network = loopback_http();
    network.http_port = taken_port;

    let (handler, _rx) = recording_handler();
    let err = bind(&network, None, handler).await.unwrap_err();
    assert!(
        matches!(err, gantry_transport::TransportError::Bind { .. }),
        "expected a bind error, got {err}"
    );
}

#[tokio::test]
async fn shutdown_releases_the_socket() {
    let (handler, _rx) = recording_handler();
    let engine = bind(&loopback_http(), None, handler).await.expect("bind");
    let addr = engine.bound_addresses()[0].addr;

    engine.shutdown();

    // The accept loop drops the listener once aborted; give it a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tokio::net::TcpListener::bind(addr)
        .await
        .expect("port should be free after shutdown");
}

#[tokio::test]
async fn https_without_tls_material_is_rejected() {
    let mut network = loopback_http();
    network.https_enabled = true;

    let (handler, _rx) = recording_handler();
    let err = bind(&network, None, handler).await.unwrap_err();
    assert!(matches!(
        err,
        gantry_transport::TransportError::Configuration { .. }
    ));
}

// ============================================================================
// TLS binding
// ============================================================================

#[tokio::test]
async fn tls_handshake_and_dispatch() {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("generate certificate");

    let mut keystore = tempfile::Builder::new()
        .suffix(".pem")
        .tempfile()
        .expect("keystore file");
    write!(
        keystore,
        "{}{}",
        certified.cert.pem(),
        certified.key_pair.serialize_pem()
    )
    .unwrap();

    let locator = Locator::resolve(keystore.path().to_str().unwrap()).unwrap();
    let tls = build_server_tls(&locator, KeystoreFormat::Pem, None, None).expect("tls material");

    let network = NetworkConfig {
        addresses: vec!["127.0.0.1".to_string()],
        http_enabled: false,
        http_port: 0,
        https_enabled: true,
        https_port: 0,
    };

    let (handler, mut rx) = recording_handler();
    let engine = bind(&network, Some(tls), handler).await.expect("bind");
    let addr = engine.bound_addresses()[0].addr;
    assert_eq!(engine.bound_addresses()[0].scheme, Scheme::Https);

    // Complete a real handshake with a client that trusts the test cert.
    let mut roots = rustls::RootCertStore::empty();
    roots.add(certified.cert.der().clone()).unwrap();
    let client_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(client_config));

    let tcp = TcpStream::connect(addr).await.expect("connect");
    let server_name = rustls::pki_types::ServerName::try_from("localhost").unwrap();
    let _tls_stream = connector
        .connect(server_name, tcp)
        .await
        .expect("TLS handshake");

    let (scheme, _peer) = recv_connection(&mut rx).await;
    assert_eq!(scheme, Scheme::Https);

    engine.shutdown();
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn http_is_bound_before_https_per_address() {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let mut keystore = tempfile::Builder::new().suffix(".pem").tempfile().unwrap();
    write!(
        keystore,
        "{}{}",
        certified.cert.pem(),
        certified.key_pair.serialize_pem()
    )
    .unwrap();
    let locator = Locator::resolve(keystore.path().to_str().unwrap()).unwrap();
    let tls = build_server_tls(&locator, KeystoreFormat::Pem, None, None).unwrap();

    let network = NetworkConfig {
        addresses: vec!["127.0.0.1".to_string()],
        http_enabled: true,
        http_port: 0,
        https_enabled: true,
        https_port: 0,
    };

    let (handler, _rx) = recording_handler();
    let engine = bind(&network, Some(tls), handler).await.expect("bind");

    let schemes: Vec<Scheme> = engine
        .bound_addresses()
        .iter()
        .map(|b| b.scheme)
        .collect();
    assert_eq!(schemes, vec![Scheme::Http, Scheme::Https]);

    engine.shutdown();
}
