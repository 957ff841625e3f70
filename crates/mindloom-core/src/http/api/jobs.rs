use axum::{Extension, Json, extract::Path};
use std::sync::Arc;

use crate::AppCore;
use crate::http::ApiError;
use crate::models::Job;

/// GET /api/jobs/{id} - job-handle status polling.
///
/// This is the only window the request path has into background work;
/// results never flow back to the original caller.
pub async fn get_job(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    core.scheduler
        .get_job(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job"))
}
