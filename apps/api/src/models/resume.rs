use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub name: String,
    pub file_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Plain text pulled from the upload; fed to the assistant.
    #[serde(skip_serializing)]
    pub text_content: String,
    pub created_at: DateTime<Utc>,
}

/// A resume ready to be inserted, after the file has been stored.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub name: String,
    pub file_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub text_content: String,
}
