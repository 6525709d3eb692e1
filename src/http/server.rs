//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounting every endpoint proxy
//! - Wire up middleware (tracing, request ID)
//! - Strip the mount prefix and dispatch to the endpoint's proxy
//! - Serve over plain TCP or TLS with graceful shutdown

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::{EndpointId, ProxyManager};

/// Time given to in-flight requests once shutdown starts on TLS listeners.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxies: Arc<ProxyManager>,
}

#[derive(Debug, Deserialize)]
struct EndpointPath {
    id: EndpointId,
}

/// HTTP server exposing the endpoint proxies.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(proxies: Arc<ProxyManager>) -> Self {
        let router = Self::build_router(AppState { proxies });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/endpoints/{id}/docker", any(engine_handler))
            .route("/api/endpoints/{id}/docker/{*path}", any(engine_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id(req),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown).await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Forward a request below `/api/endpoints/{id}/docker` to the endpoint.
async fn engine_handler(
    State(state): State<AppState>,
    Path(EndpointPath { id }): Path<EndpointPath>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();

    let Some(proxy) = state.proxies.get_proxy(id) else {
        tracing::warn!(endpoint_id = id, "No proxy registered for endpoint");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "err": "Endpoint not found" })),
        )
            .into_response();
    };

    let Some(uri) = engine_uri(request.uri()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "err": "Invalid request path" })),
        )
            .into_response();
    };
    *request.uri_mut() = uri;

    tracing::debug!(
        endpoint_id = id,
        method = %request.method(),
        path = %request.uri(),
        "Proxying request"
    );

    let response = proxy.serve(request).await;
    metrics::record_request(&id.to_string(), response.status().as_u16(), start_time);
    response
}

/// Strip the four mount segments (`/api/endpoints/{id}/docker`) from `uri`,
/// keeping the raw remainder and query.
fn engine_uri(uri: &Uri) -> Option<Uri> {
    let mut rest = uri.path();
    for _ in 0..4 {
        rest = rest.strip_prefix('/')?;
        rest = match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "",
        };
    }
    let path = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    path_and_query.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use crate::proxy::ProxyFactory;
    use crate::resource_control::FileStore;
    use tower::ServiceExt;

    #[test]
    fn test_engine_uri() {
        let uri: Uri = "/api/endpoints/3/docker/v1.41/volumes?filters=%7B%7D".parse().unwrap();
        assert_eq!(engine_uri(&uri).unwrap(), "/v1.41/volumes?filters=%7B%7D");

        let uri: Uri = "/api/endpoints/3/docker".parse().unwrap();
        assert_eq!(engine_uri(&uri).unwrap(), "/");

        let uri: Uri = "/api/endpoints/3/docker/images/library%2Fnginx/json".parse().unwrap();
        assert_eq!(engine_uri(&uri).unwrap(), "/images/library%2Fnginx/json");
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_not_found() {
        let store = Arc::new(FileStore::in_memory(vec![], vec![]));
        let manager = ProxyManager::new(ProxyFactory::new(store.clone(), store, TimeoutConfig::default()));
        let router = HttpServer::new(Arc::new(manager)).router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/endpoints/42/docker/volumes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
