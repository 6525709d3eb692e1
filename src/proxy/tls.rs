//! Mutual TLS client configuration for engine endpoints.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EndpointTlsConfig;
use crate::error::{ProxyError, ProxyResult};

/// File locations of the material used to authenticate against an engine.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    pub ca_cert_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl From<&EndpointTlsConfig> for TlsMaterial {
    fn from(config: &EndpointTlsConfig) -> Self {
        Self {
            ca_cert_path: PathBuf::from(&config.ca_cert_path),
            cert_path: PathBuf::from(&config.cert_path),
            key_path: PathBuf::from(&config.key_path),
        }
    }
}

/// Build a client configuration trusting only the engine CA and presenting
/// the client certificate.
pub fn client_config(material: &TlsMaterial) -> ProxyResult<ClientConfig> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&material.ca_cert_path)? {
        roots.add(cert).map_err(|e| {
            ProxyError::Configuration(format!(
                "invalid CA certificate {}: {}",
                material.ca_cert_path.display(),
                e
            ))
        })?;
    }

    let certs = load_certs(&material.cert_path)?;
    let key = load_private_key(&material.key_path)?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ProxyError::Configuration(format!("unsupported TLS versions: {}", e)))?
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| ProxyError::Configuration(format!("invalid client certificate or key: {}", e)))
}

fn open(path: &Path) -> ProxyResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ProxyError::Configuration(format!("unable to open {}: {}", path.display(), e)))
}

fn load_certs(path: &Path) -> ProxyResult<Vec<CertificateDer<'static>>> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Configuration(format!("unable to read {}: {}", path.display(), e)))?;
    if certs.is_empty() {
        return Err(ProxyError::Configuration(format!(
            "no certificate found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> ProxyResult<PrivateKeyDer<'static>> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ProxyError::Configuration(format!("unable to read {}: {}", path.display(), e)))?
        .ok_or_else(|| ProxyError::Configuration(format!("no private key found in {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/tls")
            .join(name)
    }

    fn fixture_material() -> TlsMaterial {
        TlsMaterial {
            ca_cert_path: fixture("ca.pem"),
            cert_path: fixture("cert.pem"),
            key_path: fixture("key.pem"),
        }
    }

    #[test]
    fn test_valid_material_builds_config() {
        assert!(client_config(&fixture_material()).is_ok());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut material = fixture_material();
        material.key_path = fixture("absent-key.pem");

        let err = client_config(&material).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(ref msg) if msg.contains("absent-key.pem")));
    }

    #[test]
    fn test_certificate_is_not_a_key() {
        let mut material = fixture_material();
        material.key_path = fixture("cert.pem");

        let err = client_config(&material).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(ref msg) if msg.contains("no private key")));
    }

    #[test]
    fn test_missing_files_are_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        let material = TlsMaterial {
            ca_cert_path: dir.path().join("ca.pem"),
            cert_path: dir.path().join("cert.pem"),
            key_path: dir.path().join("key.pem"),
        };
        let err = client_config(&material).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(ref msg) if msg.contains("ca.pem")));
    }

    #[test]
    fn test_file_without_pem_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, "not a certificate").unwrap();

        let err = load_certs(&ca).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(ref msg) if msg.contains("no certificate")));

        let err = load_private_key(&ca).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(ref msg) if msg.contains("no private key")));
    }
}
