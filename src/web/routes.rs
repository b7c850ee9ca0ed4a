use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

pub fn root_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(handlers::api::root))
}

// API Routes - REST API consumed by the UI
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api/v1",
        Router::new()
            // System status
            .route("/health", get(handlers::api::health_check))

            // Query endpoints
            .route("/query", post(handlers::api::generate_query))

            // History
            .route("/history", get(handlers::api::list_history))
            .route("/history/{id}", delete(handlers::api::delete_history))

            // Schema management
            .route("/schema", get(handlers::api::get_schema))
            .route("/schema/refresh", post(handlers::api::refresh_schema))
            .route("/tables", get(handlers::api::list_tables)),
    )
}
