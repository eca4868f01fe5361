mod data_listener;

use std::net::SocketAddr;
use std::sync::Arc;

use c2i::logging::{fatal, setup_logging};
use c2i::{Config, InfluxConnector, Ingestor, TimestampPolicy};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn setup_rustls() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        fatal("failed to install rustls ring provider", &"provider already set");
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => fatal("failed to install SIGTERM handler", &e),
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() {
    setup_logging();
    setup_rustls();
    info!("Starting c2i");

    let config = Config::from_env().unwrap_or_else(|e| fatal("config error", &e));
    let port = config
        .require_port()
        .unwrap_or_else(|e| fatal("config error", &e));

    let connector =
        InfluxConnector::new(config.influx).unwrap_or_else(|e| fatal("failed to build HTTP client", &e));
    let ingestor = Arc::new(Ingestor::new(connector, TimestampPolicy::processing_time()));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fatal("failed to bind listener", &e));
    info!(%addr, "listening for reports");

    let cancel = CancellationToken::new();
    let server = tokio::spawn(data_listener::serve(listener, ingestor, cancel.clone()));

    shutdown_signal().await;
    info!("shutting down");
    cancel.cancel();
    let _ = server.await;
}
