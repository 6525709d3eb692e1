//! Construction of endpoint proxies per connection kind.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::TimeoutConfig;
use crate::error::ProxyResult;
use crate::proxy::director::Director;
use crate::proxy::handler::ReverseProxy;
use crate::proxy::interceptor::{ResponseInterceptor, DEFAULT_MAX_LISTING_BYTES};
use crate::proxy::socket::UnixSocketTransport;
use crate::proxy::tls::{client_config, TlsMaterial};
use crate::proxy::transport::{ClientTransport, RoundTrip};
use crate::resource_control::{ResourceControlService, TeamService};

/// Builds reverse proxies to engine endpoints, sharing the lookups used for
/// decoration.
#[derive(Clone)]
pub struct ProxyFactory {
    resource_controls: Arc<dyn ResourceControlService>,
    teams: Arc<dyn TeamService>,
    timeouts: TimeoutConfig,
    max_listing_bytes: usize,
}

impl ProxyFactory {
    pub fn new(
        resource_controls: Arc<dyn ResourceControlService>,
        teams: Arc<dyn TeamService>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            resource_controls,
            teams,
            timeouts,
            max_listing_bytes: DEFAULT_MAX_LISTING_BYTES,
        }
    }

    /// Cap on listing bodies buffered for decoration by the built proxies.
    pub fn with_body_limit(mut self, max_listing_bytes: usize) -> Self {
        self.max_listing_bytes = max_listing_bytes;
        self
    }

    /// Plaintext HTTP proxy to `target`.
    pub fn new_http_proxy(&self, target: &Url) -> ReverseProxy {
        let director = Director::new(target, "http");
        let transport = ClientTransport::http(self.connect_timeout());
        self.build(format!("http://{}", director.authority()), director, Arc::new(transport))
    }

    /// HTTPS proxy to `target` authenticating with mutual TLS.
    pub fn new_https_proxy(&self, target: &Url, tls: &TlsMaterial) -> ProxyResult<ReverseProxy> {
        let config = client_config(tls)?;
        let director = Director::new(target, "https");
        let transport = ClientTransport::https(config, self.connect_timeout());
        Ok(self.build(format!("https://{}", director.authority()), director, Arc::new(transport)))
    }

    /// Proxy dialing the Unix socket at `path` for every request.
    pub fn new_socket_proxy(&self, path: impl AsRef<Path>) -> ReverseProxy {
        let transport = UnixSocketTransport::new(path);
        let target = format!("unix://{}", transport.path().display());
        self.build(target, Director::for_socket(), Arc::new(transport))
    }

    fn build(&self, target: String, director: Director, transport: Arc<dyn RoundTrip>) -> ReverseProxy {
        tracing::debug!(target_url = %target, "Building endpoint proxy");
        ReverseProxy::new(
            target,
            director,
            transport,
            ResponseInterceptor::new(self.resource_controls.clone(), self.teams.clone())
                .with_body_limit(self.max_listing_bytes),
            Duration::from_secs(self.timeouts.request_secs),
        )
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.connect_secs)
    }
}
