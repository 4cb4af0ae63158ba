//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the mirror
//! engine, stats, and uptime), [`build_router`] for constructing the
//! Axum router with middleware layers, the plain and TLS serve loops,
//! and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::ShadowteeError;
use crate::proxy::{self, MirrorEngine};

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
    pub mirrored: AtomicU64,
    pub rejected: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            mirrored: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Log cumulative counters, used once at shutdown.
    pub fn log_summary(&self, uptime: Duration) {
        tracing::info!(
            uptime_seconds = uptime.as_secs(),
            forwarded = self.forwarded.load(Ordering::Relaxed),
            failed = self.failed.load(Ordering::Relaxed),
            mirrored = self.mirrored.load(Ordering::Relaxed),
            rejected = self.rejected.load(Ordering::Relaxed),
            "request totals"
        );
    }
}

#[derive(Debug)]
pub struct AppState {
    pub engine: MirrorEngine,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(engine: MirrorEngine) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
            stats: Stats::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>, max_body: usize) -> Router {
    Router::new()
        .fallback(proxy::forward_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

/// Serve plain HTTP on an already bound listener until `shutdown` resolves.
pub async fn serve_plain<F>(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: F,
) -> Result<(), ShadowteeError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

pub async fn load_tls_config(cert: &Path, key: &Path) -> Result<RustlsConfig, ShadowteeError> {
    // Same provider the outbound clients use; must be installed before the
    // server config is built.
    let _ = rustls::crypto::ring::default_provider().install_default();

    RustlsConfig::from_pem_file(cert, key)
        .await
        .map_err(|source| ShadowteeError::Tls {
            cert: cert.to_path_buf(),
            key: key.to_path_buf(),
            source,
        })
}

/// Serve HTTPS on `addr` until `shutdown` resolves, then drain for up to
/// `grace`.
pub async fn serve_tls<F>(
    addr: SocketAddr,
    tls: RustlsConfig,
    router: Router,
    shutdown: F,
    grace: Duration,
) -> Result<(), ShadowteeError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = axum_server::Handle::new();

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(Some(grace));
    });

    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
