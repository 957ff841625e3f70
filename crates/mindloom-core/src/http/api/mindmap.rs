use axum::{Extension, Json, extract::Path};
use std::sync::Arc;

use crate::AppCore;
use crate::graph::MindmapGraph;
use crate::http::ApiError;

/// GET /api/mindmap/{session_id} - a session's mindmap for display.
pub async fn get_mindmap(
    Extension(core): Extension<Arc<AppCore>>,
    Path(session_id): Path<String>,
) -> Result<Json<MindmapGraph>, ApiError> {
    let graph = core.graph.fetch_map(&session_id).await?;
    Ok(Json(graph))
}
