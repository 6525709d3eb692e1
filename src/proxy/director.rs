//! Request rewriting towards a single upstream host.

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Request, Uri, Version};
use url::Url;

use crate::error::{ProxyError, ProxyResult};

/// Authority used on requests sent over a Unix socket.
pub const SOCKET_AUTHORITY: &str = "localhost";

/// Headers that apply to a single connection and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Retargets inbound requests at one upstream.
#[derive(Debug, Clone)]
pub struct Director {
    scheme: &'static str,
    authority: String,
    base_path: String,
    base_query: String,
}

impl Director {
    /// Director for a URL target, forcing `scheme`.
    pub fn new(target: &Url, scheme: &'static str) -> Self {
        let host = target.host_str().unwrap_or_default();
        let authority = match target.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Self {
            scheme,
            authority,
            base_path: target.path().to_string(),
            base_query: target.query().unwrap_or_default().to_string(),
        }
    }

    /// Director for a Unix socket target.
    pub fn for_socket() -> Self {
        Self {
            scheme: "http",
            authority: SOCKET_AUTHORITY.to_string(),
            base_path: String::new(),
            base_query: String::new(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Rewrite `req` in place so it addresses the upstream.
    pub fn direct(&self, req: &mut Request<Body>) -> ProxyResult<()> {
        let path = single_joining_slash(&self.base_path, req.uri().path());
        let query = join_query(&self.base_query, req.uri().query().unwrap_or_default());
        let path_and_query = if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        };

        let uri = Uri::builder()
            .scheme(self.scheme)
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ProxyError::Configuration(format!("invalid upstream uri: {}", e)))?;
        *req.uri_mut() = uri;
        *req.version_mut() = Version::HTTP_11;

        let headers = req.headers_mut();
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        headers.remove(header::TRANSFER_ENCODING);

        let host = HeaderValue::from_str(&self.authority)
            .map_err(|e| ProxyError::Configuration(format!("invalid upstream host: {}", e)))?;
        headers.insert(header::HOST, host);

        // An absent User-Agent is sent empty rather than left to a default.
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, HeaderValue::from_static(""));
        }
        Ok(())
    }
}

/// Join two path segments with exactly one slash between them.
pub fn single_joining_slash(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');
    match (a_slash, b_slash) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Target query first, `&` only when both sides are non-empty.
pub fn join_query(target: &str, request: &str) -> String {
    if target.is_empty() || request.is_empty() {
        format!("{}{}", target, request)
    } else {
        format!("{}&{}", target, request)
    }
}
