//! Round-trippers executing a directed request against an engine.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{
        connect::{Connect, HttpConnector},
        Client,
    },
    rt::TokioExecutor,
};
use rustls::ClientConfig;
use std::time::Duration;

use crate::error::{ProxyError, ProxyResult};

/// Executes one request/response exchange with the upstream.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, req: Request<Body>) -> ProxyResult<Response<Incoming>>;
}

/// Round-tripper backed by a pooled hyper client over TCP.
#[derive(Clone)]
pub struct ClientTransport<C> {
    client: Client<C, Body>,
}

impl ClientTransport<HttpConnector> {
    /// Plaintext HTTP.
    pub fn http(connect_timeout: Duration) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(http_connector(connect_timeout)),
        }
    }
}

impl ClientTransport<HttpsConnector<HttpConnector>> {
    /// HTTPS using the given (mutual) TLS client configuration.
    pub fn https(tls: ClientConfig, connect_timeout: Duration) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_only()
            .enable_http1()
            .wrap_connector(http_connector(connect_timeout));
        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        }
    }
}

fn http_connector(connect_timeout: Duration) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.enforce_http(false);
    connector
}

#[async_trait]
impl<C> RoundTrip for ClientTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn round_trip(&self, req: Request<Body>) -> ProxyResult<Response<Incoming>> {
        self.client
            .request(req)
            .await
            .map_err(|e| ProxyError::Transport(format!("{:?}", e)))
    }
}
