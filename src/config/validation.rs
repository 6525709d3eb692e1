//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Endpoint ids unique, URLs parseable with a supported scheme
//! - TLS material only where it can be used
//! - Value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidAddress { field: &'static str, value: String },
    DuplicateEndpoint(u32),
    InvalidEndpointUrl { id: u32, reason: String },
    UnsupportedScheme { id: u32, scheme: String },
    SocketWithTls(u32),
    HttpsWithoutTls(u32),
    ZeroTimeout(&'static str),
    ZeroLimit(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidAddress { field, value } => {
                write!(f, "{} is not a socket address: {}", field, value)
            }
            ValidationError::DuplicateEndpoint(id) => write!(f, "endpoint {} is declared twice", id),
            ValidationError::InvalidEndpointUrl { id, reason } => {
                write!(f, "endpoint {} has an invalid url: {}", id, reason)
            }
            ValidationError::UnsupportedScheme { id, scheme } => {
                write!(f, "endpoint {} uses unsupported scheme `{}`", id, scheme)
            }
            ValidationError::SocketWithTls(id) => {
                write!(f, "endpoint {} is a socket endpoint and cannot use TLS", id)
            }
            ValidationError::HttpsWithoutTls(id) => {
                write!(f, "endpoint {} uses https without TLS material", id)
            }
            ValidationError::ZeroTimeout(field) | ValidationError::ZeroLimit(field) => {
                write!(f, "{} must be greater than zero", field)
            }
        }
    }
}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.limits.max_listing_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("limits.max_listing_body_bytes"));
    }

    let mut seen = HashSet::new();
    for endpoint in &config.endpoints {
        if !seen.insert(endpoint.id) {
            errors.push(ValidationError::DuplicateEndpoint(endpoint.id));
        }

        let url = match Url::parse(&endpoint.url) {
            Ok(url) => url,
            Err(e) => {
                errors.push(ValidationError::InvalidEndpointUrl {
                    id: endpoint.id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match (url.scheme(), endpoint.tls.is_some()) {
            ("unix", true) => errors.push(ValidationError::SocketWithTls(endpoint.id)),
            ("https", false) => errors.push(ValidationError::HttpsWithoutTls(endpoint.id)),
            ("unix" | "tcp" | "http" | "https", _) => {}
            (scheme, _) => errors.push(ValidationError::UnsupportedScheme {
                id: endpoint.id,
                scheme: scheme.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
