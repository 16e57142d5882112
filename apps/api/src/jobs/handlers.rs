use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, OrNotFound};
use crate::jobs::filters::{filter_jobs, JobListQuery};
use crate::models::job::{CreateJobRequest, UpdateJobRequest};
use crate::state::AppState;
use crate::storage::delete_best_effort;
use crate::validation::{PathParams, QueryParams, ValidatedJson};

/// A linked resume must belong to the caller; otherwise it is reported as missing.
async fn ensure_resume_owned(state: &AppState, user: &AuthUser, resume_id: Uuid) -> Result<(), AppError> {
    state
        .store
        .get_resume(&user.id, resume_id)
        .await?
        .or_not_found("Resume")
        .map(|_| ())
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(query): QueryParams<JobListQuery>,
) -> Result<Json<Value>, AppError> {
    let jobs = state.store.list_jobs(&user.id).await?;
    let jobs = filter_jobs(jobs, &query);
    Ok(Json(json!({ "success": true, "jobs": jobs })))
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if let Some(resume_id) = request.resume_id {
        ensure_resume_owned(&state, &user, resume_id).await?;
    }
    let job = state
        .store
        .create_job(&user.id, request.normalized())
        .await?;

    info!("Created job {} for user {}", job.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "job": job })),
    ))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = state.store.get_job(&user.id, id).await?.or_not_found("Job")?;
    Ok(Json(json!({ "success": true, "job": job })))
}

/// PATCH /api/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<Value>, AppError> {
    let mut job = state.store.get_job(&user.id, id).await?.or_not_found("Job")?;
    if let Some(Some(resume_id)) = patch.resume_id {
        ensure_resume_owned(&state, &user, resume_id).await?;
    }

    patch.apply(&mut job, Utc::now());
    let job = state
        .store
        .update_job(&user.id, &job, patch.resume_id.is_some())
        .await?
        .or_not_found("Job")?;
    Ok(Json(json!({ "success": true, "job": job })))
}

/// DELETE /api/jobs/:id
///
/// Chat history, suggestions and resume links go with the row; attached files are
/// removed from storage best-effort afterwards.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = state
        .store
        .delete_job(&user.id, id)
        .await?
        .or_not_found("Job")?;
    for key in job.file_keys() {
        delete_best_effort(state.files.as_ref(), key).await;
    }

    info!("Deleted job {id} for user {}", user.id);
    Ok(Json(json!({ "success": true })))
}
