mod cors;
mod generate;
mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::generate::GenerateService;
use crate::domain::request::DeliveryMode;
use crate::infra::assets;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub generate: Arc<GenerateService>,
    /// Applied when a request does not name a delivery mode.
    pub default_delivery: DeliveryMode,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::serve_index))
        .route("/static/{*path}", get(assets::serve_asset))
        .route("/health", get(health))
        .route("/generate", post(generate::generate))
        .with_state(state)
        .layer(axum_middleware::from_fn(cors::permissive_cors))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
