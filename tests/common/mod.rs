//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

use engine_proxy::config::TimeoutConfig;
use engine_proxy::proxy::{ProxyFactory, ProxyManager};
use engine_proxy::resource_control::{FileStore, ResourceControl, ResourceControlId, ResourceKind, Team, TeamId, UserId};

/// Canned engine reply.
#[derive(Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Request heads received by a mock engine, oldest first.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    pub fn heads(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> String {
        self.heads().pop().expect("no request captured")
    }

    /// Header value of the last request, matched case-insensitively.
    pub fn last_header(&self, name: &str) -> Option<String> {
        let head = self.last();
        head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    }

    pub fn last_request_line(&self) -> String {
        self.last().lines().next().unwrap_or_default().to_string()
    }
}

/// Start a mock engine on an ephemeral TCP port.
pub async fn start_mock_engine(reply: MockReply) -> (SocketAddr, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Captured::default();

    let record = captured.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, reply.clone(), record.clone()));
        }
    });

    (addr, captured)
}

/// Start a mock engine listening on a Unix socket at `path`.
pub async fn start_mock_socket_engine(path: &Path, reply: MockReply) -> Captured {
    let listener = UnixListener::bind(path).unwrap();
    let captured = Captured::default();

    let record = captured.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, reply.clone(), record.clone()));
        }
    });

    captured
}

async fn answer<S>(mut socket: S, reply: MockReply, captured: Captured)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let end = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap_or(buf.len());
    captured
        .0
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&buf[..end]).into_owned());

    let reason = match reply.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason,
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Path of a PEM file under `tests/fixtures/tls`.
pub fn tls_fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

/// Start an HTTPS mock engine that only accepts clients presenting a
/// certificate issued by the fixture CA. Every path answers `body`.
pub async fn start_mock_tls_engine(body: &'static str) -> SocketAddr {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let mut roots = RootCertStore::empty();
    for cert in read_certs("ca.pem") {
        roots.add(cert).unwrap();
    }
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(tls_fixture("server-key.pem")).unwrap()))
        .unwrap()
        .unwrap();
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_client_cert_verifier(verifier)
        .with_single_cert(read_certs("server.pem"), key)
        .unwrap();

    let app = Router::new().fallback(move || async move { ([("content-type", "application/json")], body) });
    let handle = axum_server::Handle::new();
    let server = axum_server::bind_rustls("127.0.0.1:0".parse().unwrap(), RustlsConfig::from_config(Arc::new(config)))
        .handle(handle.clone());
    tokio::spawn(async move {
        let _ = server.serve(app.into_make_service()).await;
    });

    handle.listening().await.expect("TLS engine failed to bind")
}

fn read_certs(name: &str) -> Vec<rustls::pki_types::CertificateDer<'static>> {
    let mut reader = BufReader::new(File::open(tls_fixture(name)).unwrap());
    rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>().unwrap()
}

pub fn control(id: u32, resource_id: &str, kind: ResourceKind, users: &[u32], teams: &[u32]) -> ResourceControl {
    ResourceControl {
        id: ResourceControlId(id),
        resource_id: resource_id.to_string(),
        kind,
        users: users.iter().copied().map(UserId).collect(),
        teams: teams.iter().copied().map(TeamId).collect(),
    }
}

pub fn team(id: u32) -> Team {
    Team {
        id: TeamId(id),
        name: format!("team-{}", id),
    }
}

/// Proxy factory backed by an in-memory store.
pub fn factory(controls: Vec<ResourceControl>, teams: Vec<Team>) -> ProxyFactory {
    let store = Arc::new(FileStore::in_memory(controls, teams));
    let timeouts = TimeoutConfig {
        connect_secs: 2,
        request_secs: 5,
    };
    ProxyFactory::new(store.clone(), store, timeouts)
}

/// Proxy manager backed by an in-memory store.
pub fn manager(controls: Vec<ResourceControl>, teams: Vec<Team>) -> ProxyManager {
    ProxyManager::new(factory(controls, teams))
}
