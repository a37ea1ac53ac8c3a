//! TLS material builder
//!
//! Turns a keystore locator into a ready server-side TLS configuration.
//! Pure and stateless; called once per secure listener during start.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use gantry_config::{KeystoreFormat, Locator};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use tracing::{debug, info, warn};

use crate::{Result, TransportError};

/// Build a server TLS configuration from a keystore.
///
/// The keystore must resolve to a local file. Client certificates are not
/// requested: the resulting configuration performs one-way TLS only.
/// Any underlying failure (missing file, unparseable bundle, no key) is
/// reported as a single [`TransportError::Tls`].
pub fn build_server_tls(
    keystore: &Locator,
    format: KeystoreFormat,
    key_password: Option<&str>,
    store_password: Option<&str>,
) -> Result<Arc<ServerConfig>> {
    let path = keystore.as_path().ok_or_else(|| {
        TransportError::tls(format!(
            "Keystore locator {} is not file-backed; only local keystores can be loaded",
            keystore
        ))
    })?;

    if key_password.is_some() || store_password.is_some() {
        debug!("Keystore passwords supplied; unused for unencrypted PEM bundles");
    }

    let (certs, key) = match format {
        KeystoreFormat::Pem => load_pem_bundle(path)?,
    };

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| TransportError::tls(format!("Invalid certificate/key pair: {}", e)))?;

    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    info!(keystore = %keystore, "Created server TLS configuration");
    Ok(Arc::new(config))
}

/// Load certificate chain and private key from a single PEM bundle.
fn load_pem_bundle(
    path: &std::path::Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let file = File::open(path).map_err(|e| {
        TransportError::tls(format!("Cannot open keystore {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let mut certs: Vec<CertificateDer<'static>> = Vec::new();
    let mut key: Option<PrivateKeyDer<'static>> = None;

    for item in rustls_pemfile::read_all(&mut reader) {
        let item = item.map_err(|e| {
            TransportError::tls(format!("Unparseable keystore {}: {}", path.display(), e))
        })?;
        match item {
            rustls_pemfile::Item::X509Certificate(cert) => certs.push(cert),
            rustls_pemfile::Item::Pkcs8Key(k) => {
                replace_key(&mut key, PrivateKeyDer::Pkcs8(k), path)
            }
            rustls_pemfile::Item::Pkcs1Key(k) => {
                replace_key(&mut key, PrivateKeyDer::Pkcs1(k), path)
            }
            rustls_pemfile::Item::Sec1Key(k) => replace_key(&mut key, PrivateKeyDer::Sec1(k), path),
            other => {
                debug!(?other, "Skipping unrecognized PEM section");
            }
        }
    }

    if certs.is_empty() {
        return Err(TransportError::tls(format!(
            "No certificates found in keystore {}",
            path.display()
        )));
    }
    let key = key.ok_or_else(|| {
        TransportError::tls(format!(
            "No private key found in keystore {}",
            path.display()
        ))
    })?;

    info!(
        "Loaded {} certificates and private key from {}",
        certs.len(),
        path.display()
    );
    Ok((certs, key))
}

fn replace_key(
    slot: &mut Option<PrivateKeyDer<'static>>,
    key: PrivateKeyDer<'static>,
    path: &std::path::Path,
) {
    if slot.is_some() {
        warn!(
            "Keystore {} contains multiple private keys; using the first",
            path.display()
        );
        return;
    }
    *slot = Some(key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_bundle(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".pem")
            .tempfile()
            .expect("create keystore file");
        file.write_all(content.as_bytes()).expect("write keystore");
        file
    }

    fn self_signed_bundle() -> String {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .expect("generate certificate");
        format!("{}{}", cert.cert.pem(), cert.key_pair.serialize_pem())
    }

    #[test]
    fn builds_from_pem_bundle() {
        let file = write_bundle(&self_signed_bundle());
        let locator = Locator::resolve(file.path().to_str().unwrap()).unwrap();

        let config = build_server_tls(&locator, KeystoreFormat::Pem, None, None).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }

    #[test]
    fn missing_keystore_fails() {
        let locator = Locator::resolve("/nonexistent/keystore.pem").unwrap();
        let err = build_server_tls(&locator, KeystoreFormat::Pem, None, None).unwrap_err();
        assert!(matches!(err, TransportError::Tls { .. }));
    }

    #[test]
    fn bundle_without_key_fails() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let file = write_bundle(&cert.cert.pem());
        let locator = Locator::resolve(file.path().to_str().unwrap()).unwrap();

        let err = build_server_tls(&locator, KeystoreFormat::Pem, None, None).unwrap_err();
        assert!(matches!(err, TransportError::Tls { .. }));
    }

    #[test]
    fn remote_locator_fails() {
        let locator = Locator::resolve("https://example.com/keystore.pem").unwrap();
        let err = build_server_tls(&locator, KeystoreFormat::Pem, None, None).unwrap_err();
        assert!(matches!(err, TransportError::Tls { .. }));
    }
}
