//! Access-controlled reverse proxy to container engine endpoints.
//!
//! Forwards engine API calls over HTTP, HTTPS with mutual TLS, or a local
//! Unix socket, and decorates resource listings with the ownership records
//! held by the management layer.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resource_control;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyFactory, ProxyManager, ReverseProxy};
