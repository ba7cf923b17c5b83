//! HTTP server assembly: wires the `gateway-core` collaborators together
//! and serves the routes declared in [`crate::api`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use gateway_core::{MetricsStore, RateLimiter, RouterConfig, RpcClient, ScoreCache, SpilloverRouter};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config;

/// Loads configuration, constructs the shared core collaborators, and
/// serves the HTTP API until a `ctrl_c` signal is received.
pub async fn run(config_path: Option<PathBuf>, port_override: Option<u16>, data_dir: PathBuf) -> Result<()> {
    let mut cfg = config::load(config_path.as_deref())?;
    if let Some(port) = port_override {
        cfg.server.port = port;
    }

    let quota_path = data_dir.join("usage_counters.json");
    let metrics = Arc::new(MetricsStore::new());
    let quota = Arc::new(gateway_core::QuotaManager::load(&quota_path).await);
    let rate_limiter = Arc::new(RateLimiter::default());
    let client: Arc<dyn gateway_core::Dispatcher> = Arc::new(RpcClient::new());
    let score_cache = Arc::new(if cfg.cache.enabled {
        ScoreCache::with_ttl(Duration::from_secs_f64(cfg.cache.ttl_seconds))
    } else {
        ScoreCache::with_ttl(Duration::ZERO)
    });

    let router_config = RouterConfig {
        dispatch_timeout: Duration::from_millis(cfg.dispatch_timeout_ms),
        enable_exploration: cfg.exploration.enabled,
        exploration_rate: cfg.exploration.rate,
    };

    let router = Arc::new(SpilloverRouter::new(
        cfg.providers.clone(),
        metrics.clone(),
        quota,
        rate_limiter,
        client,
        score_cache,
        router_config,
    ));

    info!(providers = cfg.providers.len(), "gateway collaborators constructed");

    let app = build_app(router, quota_path);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("invalid server address")?;

    info!("HTTP server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("gateway shutdown complete");
    Ok(())
}

fn build_app(router: Arc<SpilloverRouter>, quota_path: PathBuf) -> Router {
    Router::new()
        .merge(crate::api::api_router(router, quota_path))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
