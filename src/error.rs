//! Proxy error taxonomy and its mapping to client responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::resource_control::ResourceKind;

/// Errors raised while building or running an endpoint proxy.
///
/// Every variant is terminal for the request it occurs in. None of them are
/// retried.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// TLS material or upstream target unusable at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dial, connect, TLS handshake, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream listing body does not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A listed resource lacks its identifying field.
    #[error("{kind} object is missing its `{field}` identifier")]
    MissingIdentifier {
        kind: ResourceKind,
        field: &'static str,
    },

    /// The resource-control or team lookup failed.
    #[error("resource control lookup failed: {0}")]
    Store(String),
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// Message safe to hand back to API clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "Endpoint is not configured correctly",
            ProxyError::Transport(_) => "Unable to reach the container engine",
            ProxyError::MalformedResponse(_) | ProxyError::MissingIdentifier { .. } => {
                "Unable to process the container engine response"
            }
            ProxyError::Store(_) => "Unable to retrieve resource controls",
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "configuration",
            ProxyError::Transport(_) => "transport",
            ProxyError::MalformedResponse(_) => "malformed_response",
            ProxyError::MissingIdentifier { .. } => "missing_identifier",
            ProxyError::Store(_) => "store",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "err": self.public_message() })),
        )
            .into_response()
    }
}
