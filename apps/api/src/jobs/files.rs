//! Files attached directly to a job (`/api/jobs/:id/files/:kind`): a tailored resume
//! and a cover letter. Uploading over an existing file replaces it.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, OrNotFound};
use crate::models::job::FileKind;
use crate::state::AppState;
use crate::storage::{delete_best_effort, object_key, signed_url, upload::read_upload};
use crate::validation::PathParams;

type FilePath = PathParams<(Uuid, FileKind)>;

/// POST /api/jobs/:id/files/:kind (multipart: `file`)
pub async fn handle_upload_job_file(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((id, kind)): FilePath,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut job = state.store.get_job(&user.id, id).await?.or_not_found("Job")?;
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;

    let key = object_key(kind.key_prefix(), &user.id, &upload.file_name, Utc::now());
    state
        .files
        .put(&key, upload.bytes, &upload.content_type)
        .await?;

    let previous = job.file_key(kind).map(str::to_string);
    job.set_file_key(kind, Some(key.clone()));
    job.updated_at = Utc::now();
    let attached = state.store.update_job(&user.id, &job, false).await;
    if !matches!(attached, Ok(Some(_))) {
        warn!("Could not attach {key} to job {id}, removing the upload");
        delete_best_effort(state.files.as_ref(), &key).await;
    }
    let job = attached?.or_not_found("Job")?;
    if let Some(previous) = previous {
        delete_best_effort(state.files.as_ref(), &previous).await;
    }

    info!("Attached {} to job {id}", kind.label());
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "job": job })),
    ))
}

/// GET /api/jobs/:id/files/:kind
pub async fn handle_download_job_file(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((id, kind)): FilePath,
) -> Result<Redirect, AppError> {
    let job = state.store.get_job(&user.id, id).await?.or_not_found("Job")?;
    let key = job.file_key(kind).or_not_found(kind.label())?;
    let signed = signed_url(state.files.as_ref(), key, state.config.signed_url_ttl_secs).await?;
    Ok(Redirect::temporary(&signed.url))
}

/// DELETE /api/jobs/:id/files/:kind
pub async fn handle_delete_job_file(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((id, kind)): FilePath,
) -> Result<Json<Value>, AppError> {
    let mut job = state.store.get_job(&user.id, id).await?.or_not_found("Job")?;
    let key = job.file_key(kind).or_not_found(kind.label())?.to_string();

    job.set_file_key(kind, None);
    job.updated_at = Utc::now();
    let job = state
        .store
        .update_job(&user.id, &job, false)
        .await?
        .or_not_found("Job")?;
    delete_best_effort(state.files.as_ref(), &key).await;

    Ok(Json(json!({ "success": true, "job": job })))
}
