use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::{AppError, OrNotFound};
use crate::models::contact::CreateInteractionRequest;
use crate::state::AppState;
use crate::validation::{normalize, PathParams, ValidatedJson};

/// GET /api/contacts/:id/interactions
pub async fn handle_list_interactions(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(contact_id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    state
        .store
        .get_contact(&user.id, contact_id)
        .await?
        .or_not_found("Contact")?;
    let interactions = state.store.list_interactions(&user.id, contact_id).await?;
    Ok(Json(json!({ "success": true, "interactions": interactions })))
}

/// POST /api/contacts/:id/interactions
///
/// Any type other than `note` also moves the contact's `lastContactedAt`.
pub async fn handle_create_interaction(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(contact_id): PathParams<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateInteractionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = CreateInteractionRequest {
        notes: normalize(request.notes),
        ..request
    };
    let interaction = state
        .store
        .create_interaction(&user.id, contact_id, request)
        .await?
        .or_not_found("Contact")?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "interaction": interaction })),
    ))
}

/// DELETE /api/contacts/:id/interactions/:interaction_id
pub async fn handle_delete_interaction(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams((contact_id, interaction_id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    if !state
        .store
        .delete_interaction(&user.id, contact_id, interaction_id)
        .await?
    {
        return Err(AppError::NotFound("Interaction not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}
