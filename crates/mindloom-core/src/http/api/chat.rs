use axum::{Extension, Json};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::AppCore;
use crate::chat::{self, ChatOutcome, ChatRequest};
use crate::http::ApiError;
use crate::models::ProviderReply;

/// POST /api/chat - single-provider streaming chat turn.
pub async fn chat(
    Extension(core): Extension<Arc<AppCore>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
    // Validation failures are rejected before any work is scheduled.
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is required"));
    }
    if request.session_id.trim().is_empty() {
        return Err(ApiError::bad_request("session_id is required"));
    }
    if request.account_id.trim().is_empty() {
        return Err(ApiError::bad_request("account_id is required"));
    }

    let outcome = chat::respond(&core, request).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub question: String,
    /// Relay channel the tagged fragments stream to.
    #[serde(default)]
    pub channel: Option<String>,
}

/// POST /api/chat/broadcast - fan the question out to every provider.
pub async fn broadcast(
    Extension(core): Extension<Arc<AppCore>>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<HashMap<String, ProviderReply>>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is required"));
    }
    if core.providers.is_empty() {
        return Err(ApiError::bad_request("no providers configured"));
    }

    let channel = request.channel.as_deref().unwrap_or("broadcast");
    let results = chat::fan_out(&core, channel, &request.question).await;
    Ok(Json(results))
}
