//! Engine endpoint proxying subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request (engine API path)
//!     → director.rs (scheme, host, path, query, headers)
//!     → transport.rs / socket.rs (RoundTrip: HTTP, HTTPS+mTLS, Unix socket)
//!     → interceptor.rs (listing responses only)
//!     → decorator.rs (attach resource control metadata)
//!     → response to client
//! ```
//!
//! # Design Decisions
//! - One `RoundTrip` trait for every connection kind, so interception is
//!   written once
//! - Socket connections are dialed per request, TCP clients are pooled
//! - Listing bodies are buffered fully before anything is written back

pub mod decorator;
pub mod director;
pub mod factory;
pub mod handler;
pub mod interceptor;
pub mod manager;
pub mod socket;
pub mod tls;
pub mod transport;

pub use factory::ProxyFactory;
pub use handler::ReverseProxy;
pub use manager::{EndpointId, ProxyManager};
pub use tls::TlsMaterial;
pub use transport::RoundTrip;
