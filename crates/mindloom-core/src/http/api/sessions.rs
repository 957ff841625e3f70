use axum::{Extension, Json, extract::Path};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppCore;
use crate::chat;
use crate::http::ApiError;
use crate::models::{ChatExchange, SessionMemory};

/// GET /api/sessions/{id}/memory
pub async fn get_memory(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<SessionMemory>, ApiError> {
    let doc = core.memory.read(&id)?.unwrap_or_else(|| SessionMemory {
        session_id: id,
        messages: Vec::new(),
        summary: None,
        updated_at: chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(doc))
}

/// DELETE /api/sessions/{id}/memory - administrative clear.
pub async fn clear_memory(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cleared = core.memory.clear(&id)?;
    Ok(Json(json!({ "cleared": cleared })))
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub question: String,
}

/// POST /api/sessions/{id}/title - one-shot room title generation.
pub async fn generate_title(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is required"));
    }

    let title = chat::generate_room_title(&core, &request.question).await?;
    Ok(Json(json!({ "session_id": id, "title": title })))
}

/// GET /api/sessions/{id}/exchanges
pub async fn list_exchanges(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatExchange>>, ApiError> {
    Ok(Json(core.exchanges.list_for_session(&id)?))
}
