//! Round-tripper speaking HTTP/1.1 over a Unix domain socket.
//!
//! A fresh connection is dialed for every request; nothing is pooled.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{uri::PathAndQuery, Request, Response, Uri};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;

use crate::error::{ProxyError, ProxyResult};
use crate::proxy::transport::RoundTrip;

/// Dials the engine socket per request.
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    path: PathBuf,
}

impl UnixSocketTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RoundTrip for UnixSocketTransport {
    async fn round_trip(&self, mut req: Request<Body>) -> ProxyResult<Response<Incoming>> {
        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            ProxyError::Transport(format!("unable to dial {}: {}", self.path.display(), e))
        })?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ProxyError::Transport(format!("engine socket handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Engine socket connection closed");
            }
        });

        // Connections made by hand expect the origin form.
        let origin = req
            .uri()
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        *req.uri_mut() = Uri::builder()
            .path_and_query(origin)
            .build()
            .map_err(|e| ProxyError::Transport(format!("invalid request uri: {}", e)))?;

        sender
            .send_request(req)
            .await
            .map_err(|e| ProxyError::Transport(format!("engine socket request failed: {}", e)))
    }
}
