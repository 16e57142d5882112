use axum::{
    extract::State,
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, OrNotFound};
use crate::models::job::{AnalyzeRequest, ChatRequest, ChatRole, JobApplication};
use crate::models::resume::Resume;
use crate::state::AppState;
use crate::validation::{PathParams, ValidatedJson};

/// An empty body falls back to the job's linked resume; anything else has to parse.
fn analyze_request(body: &[u8]) -> Result<AnalyzeRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalyzeRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid analyze request: {e}")))
}

async fn owned_job(state: &AppState, user: &AuthUser, id: Uuid) -> Result<JobApplication, AppError> {
    state.store.get_job(&user.id, id).await?.or_not_found("Job")
}

async fn owned_resume(state: &AppState, user: &AuthUser, id: Uuid) -> Result<Resume, AppError> {
    state.store.get_resume(&user.id, id).await?.or_not_found("Resume")
}

/// POST /api/jobs/:id/analyze
///
/// Scores the chosen resume (body `resumeId`, else the job's linked resume) against the
/// job and replaces the job's stored suggestions.
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let request = analyze_request(&body)?;
    let job = owned_job(&state, &user, id).await?;

    let resume_id = request.resume_id.or(job.resume_id).ok_or_else(|| {
        AppError::BadRequest("No resume selected: pass resumeId or link a resume to the job".into())
    })?;
    let resume = owned_resume(&state, &user, resume_id).await?;
    if resume.text_content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Resume has no extractable text".to_string(),
        ));
    }

    let analysis = state.assistant.analyze(&job, &resume.text_content).await?;
    let suggestions = state
        .store
        .replace_suggestions(&user.id, job.id, Some(resume.id), &analysis.suggestions)
        .await?
        .or_not_found("Job")?;

    info!(
        "Analyzed resume {} against job {} (score {})",
        resume.id, job.id, analysis.match_score
    );
    Ok(Json(json!({
        "success": true,
        "analysis": {
            "matchScore": analysis.match_score,
            "summary": analysis.summary,
            "resumeId": resume.id,
        },
        "suggestions": suggestions,
    })))
}

/// GET /api/jobs/:id/suggestions
pub async fn handle_list_suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = owned_job(&state, &user, id).await?;
    let suggestions = state.store.list_suggestions(&user.id, job.id).await?;
    Ok(Json(json!({ "success": true, "suggestions": suggestions })))
}

/// GET /api/jobs/:id/chat
pub async fn handle_list_chat(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = owned_job(&state, &user, id).await?;
    let messages = state.store.list_chat_messages(&user.id, job.id).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

/// POST /api/jobs/:id/chat
///
/// The user's message is stored before the model is asked, so it survives an LLM failure.
pub async fn handle_chat(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let job = owned_job(&state, &user, id).await?;
    let history = state.store.list_chat_messages(&user.id, job.id).await?;
    let resume_text = match job.resume_id {
        Some(resume_id) => state
            .store
            .get_resume(&user.id, resume_id)
            .await?
            .map(|r| r.text_content),
        None => None,
    };

    let content = request.message.trim();
    let message = state
        .store
        .add_chat_message(&user.id, job.id, ChatRole::User, content)
        .await?
        .or_not_found("Job")?;

    let reply = state
        .assistant
        .chat(&job, resume_text.as_deref(), &history, content)
        .await?;
    let reply = state
        .store
        .add_chat_message(&user.id, job.id, ChatRole::Assistant, &reply)
        .await?
        .or_not_found("Job")?;

    Ok(Json(json!({
        "success": true,
        "message": message,
        "reply": reply,
    })))
}
