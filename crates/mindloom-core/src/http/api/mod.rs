//! REST API route handlers.

pub mod chat;
pub mod jobs;
pub mod mindmap;
pub mod sessions;
pub mod stream;

use axum::{
    Router,
    routing::{get, post},
};

pub fn router() -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/broadcast", post(chat::broadcast))
        .route("/stream/{channel}", get(stream::subscribe))
        .route(
            "/sessions/{id}/memory",
            get(sessions::get_memory).delete(sessions::clear_memory),
        )
        .route("/sessions/{id}/title", post(sessions::generate_title))
        .route("/sessions/{id}/exchanges", get(sessions::list_exchanges))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/mindmap/{session_id}", get(mindmap::get_mindmap))
}
