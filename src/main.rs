//! Engine proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                    ENGINE PROXY                       │
//!                          │                                                       │
//!   Client Request         │  ┌──────────┐    ┌──────────────┐    ┌────────────┐  │
//!   ───────────────────────┼─▶│   http   │───▶│ proxy manager│───▶│  director  │  │
//!   /api/endpoints/{id}/   │  │  server  │    │  (endpoint)  │    │ (rewrite)  │  │
//!   docker/...             │  └──────────┘    └──────────────┘    └─────┬──────┘  │
//!                          │                                            │         │
//!                          │                                            ▼         │
//!   Client Response        │  ┌──────────┐    ┌──────────────┐    ┌────────────┐  │
//!   ◀──────────────────────┼──│decorator │◀───│ interceptor  │◀───│ transport  │◀─┼── Engine
//!                          │  │          │    │  (listings)  │    │http/tls/uds│  │
//!                          │  └────▲─────┘    └──────────────┘    └────────────┘  │
//!                          │       │                                             │
//!                          │  ┌────┴──────────────┐                              │
//!                          │  │ resource control  │  store file, hot reloaded    │
//!                          │  │     store         │                              │
//!                          │  └───────────────────┘                              │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use engine_proxy::config::{load_config, ProxyConfig};
use engine_proxy::http::tls::load_listener_tls;
use engine_proxy::http::HttpServer;
use engine_proxy::lifecycle::{signals, Shutdown};
use engine_proxy::observability::{logging, metrics};
use engine_proxy::proxy::{ProxyFactory, ProxyManager};
use engine_proxy::resource_control::watcher::StoreWatcher;
use engine_proxy::resource_control::FileStore;

#[derive(Parser, Debug)]
#[command(name = "engine-proxy", version, about = "Access-controlled container engine proxy")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(level, config.observability.json_logs);

    tracing::info!("engine-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("Crypto provider already installed");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let store = Arc::new(match &config.store.path {
        Some(path) => FileStore::open(Path::new(path))?,
        None => FileStore::in_memory(vec![], vec![]),
    });

    // Held until exit; dropping it stops the watch.
    let _store_watcher = if config.store.watch {
        StoreWatcher::new(store.clone())
            .filter(|_| store.path().is_some_and(Path::exists))
            .and_then(|watcher| match watcher.run() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to start store watcher");
                    None
                }
            })
    } else {
        None
    };

    let factory = ProxyFactory::new(store.clone(), store.clone(), config.timeouts.clone())
        .with_body_limit(config.limits.max_listing_body_bytes);
    let proxies = Arc::new(ProxyManager::new(factory));
    for endpoint in &config.endpoints {
        if let Err(e) = proxies.create_and_register_proxy(endpoint) {
            tracing::error!(
                endpoint_id = endpoint.id,
                endpoint = %endpoint.name,
                error = %e,
                "Unable to create endpoint proxy"
            );
        }
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoints = proxies.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(proxies);

    let mut server_task = match &config.listener.tls {
        Some(tls) => {
            let tls = load_listener_tls(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            tokio::spawn(server.run_tls(addr, tls, server_shutdown))
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tokio::spawn(server.run(listener, server_shutdown))
        }
    };

    tokio::select! {
        _ = signals::wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => result??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
