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
use crate::contacts::filters::{filter_contacts, group_by_company, ContactListQuery};
use crate::errors::{AppError, OrNotFound};
use crate::models::contact::{CreateContactRequest, UpdateContactRequest};
use crate::state::AppState;
use crate::validation::{PathParams, QueryParams, ValidatedJson};

/// GET /api/contacts
///
/// With `groupByCompany=true` the response also carries `groups`, keyed by company.
pub async fn handle_list_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    QueryParams(query): QueryParams<ContactListQuery>,
) -> Result<Json<Value>, AppError> {
    let contacts = state.store.list_contacts(&user.id).await?;
    let contacts = filter_contacts(contacts, &query);

    let mut body = json!({ "success": true, "contacts": contacts });
    if query.group_by_company {
        body["groups"] = json!(group_by_company(&contacts));
    }
    Ok(Json(body))
}

/// POST /api/contacts
pub async fn handle_create_contact(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateContactRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let contact = state
        .store
        .create_contact(&user.id, request.normalized())
        .await?;
    info!("Created contact {} for user {}", contact.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "contact": contact })),
    ))
}

/// GET /api/contacts/:id
///
/// The contact with its interactions (newest first) and reminders (soonest first).
pub async fn handle_get_contact(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    let contact = state
        .store
        .get_contact(&user.id, id)
        .await?
        .or_not_found("Contact")?;
    let interactions = state.store.list_interactions(&user.id, id).await?;
    let reminders = state.store.list_reminders(&user.id, id).await?;

    Ok(Json(json!({
        "success": true,
        "contact": contact,
        "interactions": interactions,
        "reminders": reminders,
    })))
}

/// PATCH /api/contacts/:id
pub async fn handle_update_contact(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdateContactRequest>,
) -> Result<Json<Value>, AppError> {
    let mut contact = state
        .store
        .get_contact(&user.id, id)
        .await?
        .or_not_found("Contact")?;
    patch.apply(&mut contact, Utc::now());
    let contact = state
        .store
        .update_contact(&user.id, &contact)
        .await?
        .or_not_found("Contact")?;
    Ok(Json(json!({ "success": true, "contact": contact })))
}

/// DELETE /api/contacts/:id
pub async fn handle_delete_contact(
    State(state): State<AppState>,
    user: AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_contact(&user.id, id).await? {
        return Err(AppError::NotFound("Contact not found".to_string()));
    }
    info!("Deleted contact {id} for user {}", user.id);
    Ok(Json(json!({ "success": true })))
}
