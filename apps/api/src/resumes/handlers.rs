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
use crate::models::resume::NewResume;
use crate::resumes::extract::extract_text;
use crate::state::AppState;
use crate::storage::{delete_best_effort, object_key, signed_url, upload::read_upload};
use crate::validation::PathParams;

/// GET /api/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let resumes = state.store.list_resumes(&user.id).await?;
    Ok(Json(json!({ "success": true, "resumes": resumes })))
}

/// POST /api/resumes (multipart: `file`, optional `name`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let text_content = extract_text(&upload).await?;

    let key = object_key("resumes", &user.id, &upload.file_name, Utc::now());
    let size_bytes = upload.bytes.len() as i64;
    state
        .files
        .put(&key, upload.bytes.clone(), &upload.content_type)
        .await?;

    let new_resume = NewResume {
        name: upload
            .display_name
            .clone()
            .unwrap_or_else(|| upload.file_name.clone()),
        file_key: key.clone(),
        content_type: upload.content_type.clone(),
        size_bytes,
        text_content,
    };
    let resume = match state.store.create_resume(&user.id, new_resume).await {
        Ok(resume) => resume,
        Err(e) => {
            warn!("Resume row insert failed, removing uploaded object {key}");
            delete_best_effort(state.files.as_ref(), &key).await;
            return Err(e.into());
        }
    };

    info!("Stored resume {} for user {}", resume.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "resume": resume })),
    ))
}

/// GET /api/resumes/:id
///
/// Metadata plus a short-lived download link.
pub async fn handle_get_resume(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let resume = state
        .store
        .get_resume(&user.id, id)
        .await?
        .or_not_found("Resume")?;
    let signed = signed_url(
        state.files.as_ref(),
        &resume.file_key,
        state.config.signed_url_ttl_secs,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "resume": resume,
        "signedUrl": signed.url,
        "expiresAt": signed.expires_at,
        "expiresIn": state.config.signed_url_ttl_secs,
    })))
}

/// GET /api/resumes/:id/download
pub async fn handle_download_resume(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Redirect, AppError> {
    let resume = state
        .store
        .get_resume(&user.id, id)
        .await?
        .or_not_found("Resume")?;
    let signed = signed_url(
        state.files.as_ref(),
        &resume.file_key,
        state.config.signed_url_ttl_secs,
    )
    .await?;
    Ok(Redirect::temporary(&signed.url))
}

/// DELETE /api/resumes/:id
///
/// The stored object goes first, best-effort; the row is removed regardless.
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let resume = state
        .store
        .get_resume(&user.id, id)
        .await?
        .or_not_found("Resume")?;
    delete_best_effort(state.files.as_ref(), &resume.file_key).await;
    state
        .store
        .delete_resume(&user.id, id)
        .await?
        .or_not_found("Resume")?;

    info!("Deleted resume {id} for user {}", user.id);
    Ok(Json(json!({ "success": true })))
}
