use crate::AppCore;
use axum::{Extension, Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::api;

pub fn build_router(core: Arc<AppCore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router())
        .layer(cors)
        .layer(Extension(core))
}

async fn health_check() -> &'static str {
    "OK"
}
