//! Inbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, request id, tracing)
//!     → /api/endpoints/{id}/docker/... (mount prefix stripped)
//!     → endpoint proxy (crate::proxy)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod tls;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
