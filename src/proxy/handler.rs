//! Forwarding handler bound to one engine endpoint.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::director::Director;
use crate::proxy::interceptor::{listing_kind, ResponseInterceptor};
use crate::proxy::transport::RoundTrip;

/// Reverse proxy for a single upstream: direct, round trip, intercept.
pub struct ReverseProxy {
    target: String,
    director: Director,
    transport: Arc<dyn RoundTrip>,
    interceptor: ResponseInterceptor,
    request_timeout: Duration,
}

impl std::fmt::Debug for ReverseProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseProxy")
            .field("target", &self.target)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ReverseProxy {
    pub fn new(
        target: String,
        director: Director,
        transport: Arc<dyn RoundTrip>,
        interceptor: ResponseInterceptor,
        request_timeout: Duration,
    ) -> Self {
        Self {
            target,
            director,
            transport,
            interceptor,
            request_timeout,
        }
    }

    /// Human readable upstream, for logs.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Forward `req` and return the (possibly decorated) upstream response.
    ///
    /// `req` carries the path relative to the engine API root.
    pub async fn forward(&self, mut req: Request<Body>) -> ProxyResult<Response<Body>> {
        let kind = listing_kind(req.method(), req.uri().path());
        self.director.direct(&mut req)?;

        let response = tokio::time::timeout(self.request_timeout, self.transport.round_trip(req))
            .await
            .map_err(|_| {
                ProxyError::Transport(format!("no response within {:?}", self.request_timeout))
            })??;

        self.interceptor.intercept(kind, response).await
    }

    /// Like [`forward`](Self::forward), with failures turned into a generic
    /// error response.
    pub async fn serve(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.forward(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    target_url = %self.target,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Proxy request failed"
                );
                e.into_response()
            }
        }
    }
}
