//! Registry of endpoint proxies.

use dashmap::DashMap;
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use url::Url;

use crate::config::EndpointConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::factory::ProxyFactory;
use crate::proxy::handler::ReverseProxy;
use crate::proxy::tls::TlsMaterial;

/// Endpoint identifier as used in the mount path.
pub type EndpointId = u32;

/// Holds one proxy per registered endpoint.
pub struct ProxyManager {
    factory: ProxyFactory,
    proxies: DashMap<EndpointId, Arc<ReverseProxy>>,
}

impl ProxyManager {
    pub fn new(factory: ProxyFactory) -> Self {
        Self {
            factory,
            proxies: DashMap::new(),
        }
    }

    /// Build the proxy matching the endpoint URL scheme.
    ///
    /// `tcp://` and `http://` give plaintext HTTP, or HTTPS when TLS material
    /// is configured; `https://` requires TLS material; `unix://` dials the
    /// socket path.
    pub fn create_proxy(&self, endpoint: &EndpointConfig) -> ProxyResult<ReverseProxy> {
        let url = Url::parse(&endpoint.url).map_err(|e| {
            ProxyError::Configuration(format!("invalid endpoint url {}: {}", endpoint.url, e))
        })?;

        match (url.scheme(), &endpoint.tls) {
            ("unix", None) => Ok(self.factory.new_socket_proxy(socket_path(&url)?)),
            ("tcp" | "http" | "https", Some(tls)) => {
                self.factory.new_https_proxy(&url, &TlsMaterial::from(tls))
            }
            ("tcp" | "http", None) => Ok(self.factory.new_http_proxy(&url)),
            ("https", None) => Err(ProxyError::Configuration(
                "https endpoints require TLS material".to_string(),
            )),
            ("unix", Some(_)) => Err(ProxyError::Configuration(
                "TLS is not supported on socket endpoints".to_string(),
            )),
            (scheme, _) => Err(ProxyError::Configuration(format!(
                "unsupported endpoint scheme `{}`",
                scheme
            ))),
        }
    }

    /// Build and register the endpoint's proxy, replacing any previous one.
    pub fn create_and_register_proxy(&self, endpoint: &EndpointConfig) -> ProxyResult<Arc<ReverseProxy>> {
        let proxy = Arc::new(self.create_proxy(endpoint)?);
        self.proxies.insert(endpoint.id, proxy.clone());
        tracing::info!(
            endpoint_id = endpoint.id,
            endpoint = %endpoint.name,
            target_url = %proxy.target(),
            "Endpoint proxy registered"
        );
        Ok(proxy)
    }

    pub fn factory(&self) -> &ProxyFactory {
        &self.factory
    }

    pub fn get_proxy(&self, id: EndpointId) -> Option<Arc<ReverseProxy>> {
        self.proxies.get(&id).map(|entry| entry.value().clone())
    }

    pub fn delete_proxy(&self, id: EndpointId) -> Option<Arc<ReverseProxy>> {
        self.proxies.remove(&id).map(|(_, proxy)| proxy)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

/// Filesystem path of a `unix://` URL, with percent-escapes decoded.
fn socket_path(url: &Url) -> ProxyResult<String> {
    percent_decode_str(url.path())
        .decode_utf8()
        .map(|path| path.into_owned())
        .map_err(|e| ProxyError::Configuration(format!("invalid socket path in {}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointTlsConfig, TimeoutConfig};
    use crate::resource_control::FileStore;

    fn manager() -> ProxyManager {
        let store = Arc::new(FileStore::in_memory(vec![], vec![]));
        ProxyManager::new(ProxyFactory::new(store.clone(), store, TimeoutConfig::default()))
    }

    fn endpoint(id: EndpointId, url: &str) -> EndpointConfig {
        EndpointConfig {
            id,
            name: format!("endpoint-{}", id),
            url: url.to_string(),
            tls: None,
        }
    }

    #[tokio::test]
    async fn test_register_by_scheme() {
        let manager = manager();

        let proxy = manager.create_and_register_proxy(&endpoint(1, "tcp://10.0.0.2:2375")).unwrap();
        assert_eq!(proxy.target(), "http://10.0.0.2:2375");

        let proxy = manager.create_and_register_proxy(&endpoint(2, "unix:///var/run/docker.sock")).unwrap();
        assert_eq!(proxy.target(), "unix:///var/run/docker.sock");

        let proxy = manager
            .create_and_register_proxy(&endpoint(3, "unix:///run/my engine/docker.sock"))
            .unwrap();
        assert_eq!(proxy.target(), "unix:///run/my engine/docker.sock");

        assert_eq!(manager.len(), 3);
        assert!(manager.get_proxy(1).is_some());
        assert!(manager.delete_proxy(1).is_some());
        assert!(manager.get_proxy(1).is_none());
    }

    #[test]
    fn test_rejected_endpoints() {
        let manager = manager();

        let err = manager.create_proxy(&endpoint(1, "ftp://10.0.0.2")).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(_)));

        let err = manager.create_proxy(&endpoint(2, "https://10.0.0.2:2376")).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(_)));

        let dir = tempfile::tempdir().unwrap();
        let mut with_tls = endpoint(3, "tcp://10.0.0.2:2376");
        with_tls.tls = Some(EndpointTlsConfig {
            ca_cert_path: dir.path().join("ca.pem").display().to_string(),
            cert_path: dir.path().join("cert.pem").display().to_string(),
            key_path: dir.path().join("key.pem").display().to_string(),
        });
        assert!(matches!(
            manager.create_and_register_proxy(&with_tls),
            Err(ProxyError::Configuration(_))
        ));
        assert!(manager.get_proxy(3).is_none());
        assert!(manager.is_empty());
    }
}
