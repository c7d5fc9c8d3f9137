pub mod auth;
pub mod config;
pub mod hub;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod ring;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
pub use config::Config;
pub use hub::Hub;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Arc<Config>,
}

/// Wires the five routes in the external interface: health, guarded
/// metrics, optional dev mint, and the two WebSocket upgrades.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.cors_origins);

    Router::new()
        .route("/healthz", get(http::health::healthz))
        .route("/metrics", get(http::metrics::get_metrics))
        .route("/api/session", post(http::mint::mint_session))
        .route("/ws/host", get(http::ws_host::ws_host_handler))
        .route("/ws/client", get(http::ws_client::ws_client_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
