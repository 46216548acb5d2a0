//! Job submission, status, and deletion.
//!
//! - POST /api/add: submit a download
//! - GET  /api/status: snapshot of jobs, newest first
//! - POST /api/delete: remove an owned job (and its artifact)

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use url::Url;

use fetchd_core::artifacts;
use fetchd_core::registry::StatusSnapshot;
use fetchd_core::store::{Job, JobId, NewJob};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddJobRequest {
    url: Option<String>,
    format: Option<String>,
    quality: Option<String>,
    folder: Option<String>,
    owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteJobRequest {
    id: Option<JobId>,
    owner_id: Option<String>,
}

/// Deletion outcome. Not-found and not-owned are deliberately
/// indistinguishable to the caller.
#[derive(Debug, Serialize)]
struct DeleteResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn required(field: Option<String>, name: &str) -> ApiResult<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::BadRequest(format!("missing required field: {name}"))),
    }
}

/// Folders become one path component under the download dir; anything that
/// could escape it is rejected before a job exists.
fn validated_folder(folder: Option<String>) -> ApiResult<String> {
    let folder = folder.unwrap_or_else(|| "default".to_string());
    if folder.is_empty() || folder == "." || folder == ".." || folder.contains('/') || folder.contains('\\') {
        return Err(ApiError::BadRequest(format!("invalid folder: {folder:?}")));
    }
    Ok(folder)
}

/// POST /api/add: create a job, enqueue it, and push the owner's snapshot.
async fn add_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let url = required(req.url, "url")?;
    let format = required(req.format, "format")?;
    let quality = required(req.quality, "quality")?;
    let owner_id = required(req.owner_id, "owner_id")?;
    let folder = validated_folder(req.folder)?;
    Url::parse(&url).map_err(|e| ApiError::BadRequest(format!("invalid url: {e}")))?;

    let job = state
        .registry
        .create(NewJob {
            owner_id,
            url,
            format,
            quality,
            folder,
        })
        .await?;
    state.executor.submit(job.id).await?;
    state.hub.publish(&job.owner_id);
    tracing::info!(job = job.id, owner = %job.owner_id, url = %job.url, "accepted download request");
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/status: all jobs, or one owner's. Omitting `owner_id` is the
/// administrative view.
async fn job_status(State(state): State<Arc<AppState>>, Query(q): Query<StatusQuery>) -> Json<StatusSnapshot> {
    Json(state.registry.snapshot(q.owner_id.as_deref()))
}

/// POST /api/delete: remove a job the caller owns.
async fn delete_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteJobRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = req
        .id
        .ok_or_else(|| ApiError::BadRequest("missing required field: id".to_string()))?;
    let owner_id = required(req.owner_id, "owner_id")?;

    let Some(job) = state.registry.get(id).filter(|j| j.owner_id == owner_id) else {
        return Ok(Json(DeleteResponse {
            status: "error",
            detail: Some(format!("no job {id} for this owner")),
        }));
    };

    if !job.status.is_terminal() {
        // Deleting a live job aborts its worker; the subprocess dies with
        // the dropped fetch future.
        state.cancels.cancel(id);
    }
    if let Some(ref output_ref) = job.output_ref {
        if let Some(path) = artifacts::artifact_path(&state.download_dir, output_ref) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "deleted artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "could not delete artifact: {e}"),
            }
        }
    }
    state.registry.remove(id).await?;
    state.hub.publish(&owner_id);
    tracing::info!(job = id, owner = %owner_id, "job deleted");
    Ok(Json(DeleteResponse {
        status: "success",
        detail: None,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/add", post(add_job))
        .route("/api/status", get(job_status))
        .route("/api/delete", post(delete_job))
}
