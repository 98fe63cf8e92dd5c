mod app;
mod config;
mod routes;
mod services;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, CacheSettings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let maps_dir = config::maps_dir();
    if !maps_dir.is_dir() {
        tracing::warn!(
            maps_dir = %maps_dir.display(),
            "maps directory does not exist; every segment will be empty"
        );
    }

    let colors = services::color_table_loader::load(&config::dat_path()).await;
    let cache = CacheSettings {
        ttl_secs: config::segment_cache_ttl_secs(),
        max_segments: config::max_cached_segments(),
    };
    tracing::info!(
        maps_dir = %maps_dir.display(),
        ttl_secs = cache.ttl_secs,
        max_segments = cache.max_segments,
        "segment cache configured"
    );

    let state = AppState::new(maps_dir, colors, cache);
    tracing::info!(
        segments = state.bounds.segments().len(),
        "world bounds cover {} to {}",
        state.bounds.start,
        state.bounds.end
    );

    tokio::spawn(services::segment_evictor::run(state.clone()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Odyssey map server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
