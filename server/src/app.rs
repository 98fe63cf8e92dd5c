use axum::Router;
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/tile/{x}/{y}/{z}", get(routes::api::get_tile))
        .route("/api/segment/{x}/{y}/{z}", get(routes::api::get_segment))
        .route("/api/minimap/{x}/{y}/{z}", get(routes::api::get_minimap))
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
