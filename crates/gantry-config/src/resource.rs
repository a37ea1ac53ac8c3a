//! Resource locator resolution
//!
//! Configuration values that reference external resources (the TLS keystore
//! in particular) accept either an absolute URL or a filesystem path.
//! Filesystem paths resolve to local file locators.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result};

/// URL schemes accepted as absolute locators.
const KNOWN_SCHEMES: &[&str] = &["http", "https", "ftp", "file", "jar"];

/// A resolved resource locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A local file, reachable through ordinary filesystem I/O
    File(PathBuf),
    /// A remote resource identified by an absolute URL
    Url {
        /// URL scheme (`http`, `https`, `ftp`, `jar`)
        scheme: String,
        /// The full locator string as supplied
        raw: String,
    },
}

impl Locator {
    /// Resolve a locator string.
    ///
    /// Absolute URLs with a known scheme are kept as-is; `file:` URLs and
    /// plain paths become local file locators with an absolute path.
    pub fn resolve(spec: &str) -> Result<Self> {
        if spec.is_empty() {
            return Err(ConfigError::InvalidLocator {
                spec: spec.to_string(),
                message: "Locator is empty".to_string(),
            });
        }

        if let Some((scheme, rest)) = split_scheme(spec) {
            if !KNOWN_SCHEMES.contains(&scheme) {
                return Err(ConfigError::InvalidLocator {
                    spec: spec.to_string(),
                    message: format!("Unsupported URL scheme: {}", scheme),
                });
            }
            if scheme == "file" {
                return Self::from_file_url(spec, rest);
            }
            return Ok(Self::Url {
                scheme: scheme.to_string(),
                raw: spec.to_string(),
            });
        }

        Self::local(Path::new(spec))
    }

    /// Resolve the part after `file:`. An authority component is only
    /// accepted when it is empty or `localhost`; anything else would name
    /// a remote host this locator cannot reach.
    fn from_file_url(spec: &str, rest: &str) -> Result<Self> {
        let path = match rest.strip_prefix("//") {
            Some(after) => {
                let slash = after.find('/').ok_or_else(|| ConfigError::InvalidLocator {
                    spec: spec.to_string(),
                    message: "file URL has no path".to_string(),
                })?;
                let (authority, path) = after.split_at(slash);
                if !authority.is_empty() && authority != "localhost" {
                    return Err(ConfigError::InvalidLocator {
                        spec: spec.to_string(),
                        message: format!("Unsupported file URL authority: {}", authority),
                    });
                }
                path
            }
            None => rest,
        };
        Self::local(Path::new(path))
    }

    fn local(path: &Path) -> Result<Self> {
        let absolute = std::path::absolute(path).map_err(ConfigError::Io)?;
        Ok(Self::File(absolute))
    }

    /// Whether the locator points at a local file
    pub fn is_local(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// The local path, when the locator is file-backed
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Url { .. } => None,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Url { raw, .. } => f.write_str(raw),
        }
    }
}

/// Split `scheme:rest`, accepting only plausible scheme syntax so that
/// Windows-style drive prefixes (`C:\...`) fall through to path handling.
fn split_scheme(spec: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = spec.split_once(':')?;
    if scheme.len() < 2 {
        return None;
    }
    if !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((scheme, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_resolves_to_local_file() {
        let locator = Locator::resolve("certs/server.pem").unwrap();
        assert!(locator.is_local());
        let path = locator.as_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("certs/server.pem"));
    }

    #[test]
    fn file_url_resolves_to_local_file() {
        let locator = Locator::resolve("file:///etc/gantry/server.pem").unwrap();
        assert_eq!(
            locator.as_path().unwrap(),
            Path::new("/etc/gantry/server.pem")
        );
    }

    #[test]
    fn file_url_localhost_authority_is_local() {
        let locator = Locator::resolve("file://localhost/etc/gantry/server.pem").unwrap();
        assert_eq!(
            locator.as_path().unwrap(),
            Path::new("/etc/gantry/server.pem")
        );
    }

    #[test]
    fn file_url_remote_authority_is_rejected() {
        let err = Locator::resolve("file://keyserver/etc/gantry/server.pem").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLocator { .. }));

        let err = Locator::resolve("file://keyserver").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLocator { .. }));
    }

    #[test]
    fn http_url_is_kept_remote() {
        let locator = Locator::resolve("https://example.com/keystore.pem").unwrap();
        assert!(!locator.is_local());
        match locator {
            Locator::Url { scheme, raw } => {
                assert_eq!(scheme, "https");
                assert_eq!(raw, "https://example.com/keystore.pem");
            }
            Locator::File(_) => panic!("expected a remote locator"),
        }
    }

    #[test]
    fn jar_and_ftp_schemes_are_accepted() {
        assert!(Locator::resolve("jar:file:/opt/app.jar!/keystore.pem").is_ok());
        assert!(Locator::resolve("ftp://example.com/keystore.pem").is_ok());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = Locator::resolve("gopher://example.com/x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLocator { .. }));
    }

    #[test]
    fn empty_locator_is_rejected() {
        assert!(Locator::resolve("").is_err());
    }
}
