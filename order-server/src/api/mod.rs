//! HTTP API routes

pub mod health;
pub mod orders;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the read-side router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/order/{id}", get(orders::get_order))
        .route("/api/orders", get(orders::list_orders))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
