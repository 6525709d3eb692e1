//! Listener TLS configuration.

use axum_server::tls_rustls::RustlsConfig;
use std::path::Path;

use crate::config::schema::TlsConfig;
use crate::error::{ProxyError, ProxyResult};

/// Load the listener certificate and key.
pub async fn load_listener_tls(config: &TlsConfig) -> ProxyResult<RustlsConfig> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);
    for path in [cert_path, key_path] {
        if !path.exists() {
            return Err(ProxyError::Configuration(format!(
                "listener TLS file not found: {}",
                path.display()
            )));
        }
    }

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| ProxyError::Configuration(format!("invalid listener TLS material: {}", e)))
}
