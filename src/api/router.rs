use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Operational routes
    let ops = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::scrape));

    // Marketplace routes
    let market = Router::new()
        .route(
            "/wagers",
            get(handlers::wagers::list).post(handlers::wagers::create),
        )
        .route("/buy/:wager_id", post(handlers::wagers::buy));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    ops.merge(market)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
