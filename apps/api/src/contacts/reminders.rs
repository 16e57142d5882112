use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, OrNotFound};
use crate::models::contact::{CreateReminderRequest, UpdateReminderRequest};
use crate::state::AppState;
use crate::validation::{PathParams, QueryParams, ValidatedJson};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderListQuery {
    #[serde(default)]
    pub include_completed: bool,
}

/// GET /api/reminders
///
/// Open reminders across all contacts, soonest first; `includeCompleted=true` adds the rest.
pub async fn handle_list_all_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(query): QueryParams<ReminderListQuery>,
) -> Result<Json<Value>, AppError> {
    let reminders = state
        .store
        .list_user_reminders(&user.id, query.include_completed)
        .await?;
    Ok(Json(json!({ "success": true, "reminders": reminders })))
}

/// GET /api/contacts/:id/reminders
pub async fn handle_list_reminders(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(contact_id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    state
        .store
        .get_contact(&user.id, contact_id)
        .await?
        .or_not_found("Contact")?;
    let reminders = state.store.list_reminders(&user.id, contact_id).await?;
    Ok(Json(json!({ "success": true, "reminders": reminders })))
}

/// POST /api/contacts/:id/reminders
pub async fn handle_create_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(contact_id): PathParams<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateReminderRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let reminder = state
        .store
        .create_reminder(&user.id, contact_id, request)
        .await?
        .or_not_found("Contact")?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "reminder": reminder })),
    ))
}

/// PATCH /api/contacts/:id/reminders/:reminder_id
pub async fn handle_update_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((contact_id, reminder_id)): PathParams<(Uuid, Uuid)>,
    ValidatedJson(patch): ValidatedJson<UpdateReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let mut reminder = state
        .store
        .get_reminder(&user.id, contact_id, reminder_id)
        .await?
        .or_not_found("Reminder")?;
    patch.apply(&mut reminder, Utc::now());
    let reminder = state
        .store
        .update_reminder(&user.id, &reminder)
        .await?
        .or_not_found("Reminder")?;
    Ok(Json(json!({ "success": true, "reminder": reminder })))
}

/// DELETE /api/contacts/:id/reminders/:reminder_id
pub async fn handle_delete_reminder(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((contact_id, reminder_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    if !state
        .store
        .delete_reminder(&user.id, contact_id, reminder_id)
        .await?
    {
        return Err(AppError::NotFound("Reminder not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
