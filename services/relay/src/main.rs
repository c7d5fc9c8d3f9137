use std::env;
use std::sync::Arc;
use std::time::Duration;

use relay::store::{NullStore, RedisStore, SideStore};
use relay::{AppState, Config, Hub};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let config = Config::from_env();

    let store: Arc<dyn SideStore> = match &config.redis_url {
        Some(url) => {
            info!("connecting to side-store...");
            match RedisStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => panic!("failed to connect to REDIS_URL: {e}"),
            }
        }
        None => Arc::new(NullStore),
    };

    let hub = Hub::new(
        config.ring_buffer_bytes,
        config.rate_limit_bps,
        Duration::from_secs(config.session_ttl_seconds),
        Duration::from_secs(config.idle_timeout_seconds),
        store,
    );

    let bind_addr = config.bind_addr();
    let state = AppState { hub: hub.clone(), config: Arc::new(config) };
    let router = relay::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.expect("failed to bind");
    info!(addr = %bind_addr, "relay listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
        .expect("server error");
    info!("relay shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C, then drains the hub: stop accepting new
/// connections (axum already stopped by the time this future resolves),
/// close every session with reason `shutdown`.
async fn shutdown_signal(hub: Arc<Hub>) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }

    hub.close_all(relay_protocol::reasons::SHUTDOWN).await;
}
