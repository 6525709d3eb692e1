//! Listing response interception.
//!
//! # Data Flow
//! ```text
//! upstream response (2xx, GET listing path)
//!     → buffer body
//!     → decode (bare array, or envelope object for volumes)
//!     → fresh resource control + team lookup
//!     → decorator.rs
//!     → re-encode, fix Content-Length
//! ```
//! Every other response is streamed through untouched.

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Method, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};
use crate::observability::metrics;
use crate::proxy::decorator::decorate_resource_list;
use crate::resource_control::{ResourceControl, ResourceControlService, ResourceKind, TeamService};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest listing body buffered for decoration unless configured otherwise.
pub const DEFAULT_MAX_LISTING_BYTES: usize = 64 * 1024 * 1024;

/// Kind listed by a request, if it is a listing call.
pub fn listing_kind(method: &Method, path: &str) -> Option<ResourceKind> {
    if *method != Method::GET {
        return None;
    }
    let path = strip_api_version(path);
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    ResourceKind::ALL
        .into_iter()
        .find(|kind| kind.listing_path() == path)
}

/// Drop a leading `/v1.41`-style API version segment.
fn strip_api_version(path: &str) -> &str {
    if let Some(rest) = path.strip_prefix("/v") {
        if let Some(idx) = rest.find('/') {
            let version = &rest[..idx];
            if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.') {
                return &rest[idx..];
            }
        }
    }
    path
}

/// Decorates listing responses with resource control metadata.
#[derive(Clone)]
pub struct ResponseInterceptor {
    resource_controls: Arc<dyn ResourceControlService>,
    teams: Arc<dyn TeamService>,
    max_body_bytes: usize,
}

impl ResponseInterceptor {
    pub fn new(resource_controls: Arc<dyn ResourceControlService>, teams: Arc<dyn TeamService>) -> Self {
        Self {
            resource_controls,
            teams,
            max_body_bytes: DEFAULT_MAX_LISTING_BYTES,
        }
    }

    /// Cap on the listing body size. Larger listings fail the request.
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Pass `response` through, decorating it first when it answers a
    /// successful listing of `kind`.
    pub async fn intercept<B>(
        &self,
        kind: Option<ResourceKind>,
        response: Response<B>,
    ) -> ProxyResult<Response<Body>>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let kind = match kind {
            Some(kind) if response.status().is_success() => kind,
            _ => return Ok(response.map(Body::new)),
        };

        let (mut parts, body) = response.into_parts();
        let raw = Limited::new(body, self.max_body_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    ProxyError::MalformedResponse(format!(
                        "{} listing exceeds {} bytes",
                        kind, self.max_body_bytes
                    ))
                } else {
                    ProxyError::Transport(format!("unable to read engine response: {}", e))
                }
            })?
            .to_bytes();

        let decorated = match self.decorate(kind, &raw) {
            Ok(decorated) => {
                metrics::record_decoration(kind, "decorated");
                decorated
            }
            Err(e) => {
                metrics::record_decoration(kind, e.kind());
                tracing::warn!(kind = %kind, error = %e, "Unable to decorate listing");
                return Err(e);
            }
        };
        let body = decorated.map(Bytes::from).unwrap_or(raw);

        parts.headers.remove(header::TRANSFER_ENCODING);
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        Ok(Response::from_parts(parts, Body::from(body)))
    }

    /// Decorate a raw listing body. `None` means the body is kept as is.
    pub fn decorate(&self, kind: ResourceKind, raw: &[u8]) -> ProxyResult<Option<Vec<u8>>> {
        let controls = self.controls(kind)?;
        decorate_body(kind, raw, &controls)
    }

    /// Current controls of `kind`, exactly as stored.
    fn controls(&self, kind: ResourceKind) -> ProxyResult<Vec<ResourceControl>> {
        let controls = self
            .resource_controls
            .resource_controls(kind)
            .map_err(|e| ProxyError::Store(e.to_string()))?;
        self.report_unknown_teams(&controls);
        Ok(controls)
    }

    /// Log team references the team service does not know. The metadata
    /// still carries them.
    fn report_unknown_teams(&self, controls: &[ResourceControl]) {
        let teams = match self.teams.teams() {
            Ok(teams) => teams,
            Err(e) => {
                tracing::warn!(error = %e, "Team lookup failed");
                return;
            }
        };
        for control in controls {
            let unknown: Vec<_> = control.unknown_teams(&teams).map(|id| id.0).collect();
            if !unknown.is_empty() {
                tracing::debug!(
                    resource_control = control.id.0,
                    resource_id = %control.resource_id,
                    teams = ?unknown,
                    "Resource control references unknown teams"
                );
            }
        }
    }
}

/// Decode, decorate and re-encode a listing body.
pub fn decorate_body(
    kind: ResourceKind,
    raw: &[u8],
    controls: &[ResourceControl],
) -> ProxyResult<Option<Vec<u8>>> {
    let encoded = match kind.envelope() {
        None => {
            let resources: Vec<Value> = serde_json::from_slice(raw)
                .map_err(|e| ProxyError::MalformedResponse(format!("expected a {} list: {}", kind, e)))?;
            let decorated = decorate_resource_list(kind, &resources, controls)?;
            serde_json::to_vec(&decorated)
        }
        Some(key) => {
            let mut envelope: Map<String, Value> = serde_json::from_slice(raw)
                .map_err(|e| ProxyError::MalformedResponse(format!("expected a {} listing object: {}", kind, e)))?;
            let decorated = match envelope.get(key) {
                Some(Value::Array(resources)) => decorate_resource_list(kind, resources, controls)?,
                None | Some(Value::Null) => return Ok(None),
                Some(_) => {
                    return Err(ProxyError::MalformedResponse(format!(
                        "`{}` is not a {} list",
                        key, kind
                    )))
                }
            };
            envelope.insert(key.to_string(), Value::Array(decorated));
            serde_json::to_vec(&envelope)
        }
    };
    encoded
        .map(Some)
        .map_err(|e| ProxyError::MalformedResponse(format!("unable to encode {} list: {}", kind, e)))
}
