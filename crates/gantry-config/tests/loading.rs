//! Configuration loading tests
//!
//! Tests TOML parsing, defaults, and validation through `ConfigLoader`.

use std::io::Write;

use gantry_config::{ConfigError, ConfigLoader, IdentityManagerConfig, KeystoreFormat};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn empty_file_yields_defaults() {
    let file = write_config("");
    let config = ConfigLoader::from_file(file.path()).expect("load empty config");

    assert_eq!(config.network.addresses, vec!["0.0.0.0".to_string()]);
    assert!(config.network.http_enabled);
    assert_eq!(config.network.http_port, 8080);
    assert!(!config.network.https_enabled);
    assert_eq!(config.network.https_port, 8443);
    assert!(matches!(config.identity, IdentityManagerConfig::Anonymous));
}

#[test]
fn full_config_round_trip() {
    let file = write_config(
        r#"
[network]
addresses = ["127.0.0.1", "10.0.0.1"]
http_enabled = true
http_port = 8181
https_enabled = true
https_port = 8444

[tls]
keystore = "certs/bundle.pem"
keystore_format = "pem"
key_password = "secret"

[identity]
strategy = "static"

[identity.users]
admin = "hunter2"

[logging]
level = "debug"
format = "compact"
"#,
    );
    let config = ConfigLoader::from_file(file.path()).expect("load full config");

    assert_eq!(config.network.addresses.len(), 2);
    assert_eq!(config.network.http_port, 8181);
    assert!(config.network.https_enabled);
    assert_eq!(config.tls.keystore.as_deref(), Some("certs/bundle.pem"));
    assert_eq!(config.tls.keystore_format, KeystoreFormat::Pem);
    match &config.identity {
        IdentityManagerConfig::Static { users } => {
            assert_eq!(users.get("admin").map(String::as_str), Some("hunter2"));
        }
        other => panic!("expected static identity config, got {:?}", other),
    }
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn invalid_config_fails_validation() {
    // HTTPS enabled but no keystore
    let file = write_config(
        r#"
[network]
addresses = ["127.0.0.1"]
http_enabled = false
http_port = 8080
https_enabled = true
https_port = 8444
"#,
    );
    let err = ConfigLoader::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::MissingRequired(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let file = write_config("network = [not toml");
    let err = ConfigLoader::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn missing_file_is_reported() {
    let err = ConfigLoader::from_file("/nonexistent/gantry.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
