//! Daemon lifecycle: wire the service, probe storage, serve HTTP until
//! SIGINT/SIGTERM.

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use pubseal_core::config::PubsealConfig;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::metrics::Metrics;

pub async fn run(config: PubsealConfig) -> Result<()> {
    info!("daemon starting");

    let service = Arc::new(pubseal_service::open_service(&config).await?);

    match service.check_health().await {
        Ok(()) => info!(
            backend = ?config.storage.backend,
            endpoint = %config.storage.endpoint,
            "storage: connected"
        ),
        Err(e) => warn!(
            endpoint = %config.storage.endpoint,
            "storage: {e}  (serving anyway; /readyz reports 503 until it recovers)"
        ),
    }

    let state = AppState {
        service,
        metrics: Arc::new(Metrics::new()),
    };
    let app = api::router(state, config.daemon.metrics)
        .layer(DefaultBodyLimit::max(config.daemon.max_upload_bytes));

    let listener = tokio::net::TcpListener::bind(&config.daemon.listen)
        .await
        .with_context(|| format!("binding {}", config.daemon.listen))?;

    info!(addr = %config.daemon.listen, metrics = config.daemon.metrics, "http: listening");
    notify_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("SIGTERM handler unavailable, waiting for ctrl-c only: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
    info!("shutdown signal received, draining in-flight requests");
}

/// Tell systemd (Type=notify) the listener is up. No-op outside systemd.
fn notify_ready() {
    use std::os::unix::net::UnixDatagram;

    let Ok(socket) = std::env::var("NOTIFY_SOCKET") else {
        return;
    };
    match UnixDatagram::unbound().and_then(|sock| sock.send_to(b"READY=1\n", &socket)) {
        Ok(_) => tracing::debug!(notify_socket = %socket, "sd_notify: READY=1"),
        Err(e) => warn!(notify_socket = %socket, "sd_notify failed: {e}"),
    }
}
