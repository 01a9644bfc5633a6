// src/web/mod.rs
// HTTP surface for the triage service

pub mod api;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .route("/complaints", get(api::list_complaints).post(api::submit_complaint))
        .route("/complaints/{id}", get(api::get_complaint))
        .route("/complaints/{id}/process", post(api::process_complaint))
        .route("/complaints/{id}/status", post(api::set_status))
        .with_state(state);

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
