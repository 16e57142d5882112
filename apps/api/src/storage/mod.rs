//! Object storage for uploaded files.
//!
//! Uploads go under collision-resistant keys, downloads are served as presigned URLs,
//! and deletes are best-effort: a failed delete is logged, never surfaced.

pub mod s3;
pub mod upload;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MAX_SIGNED_URL_TTL_SECS;
use crate::errors::AppError;

pub use s3::S3Storage;

const MAX_FILE_NAME: usize = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("presigning '{key}' failed: {message}")]
    Presign { key: String, message: String },

    #[error("delete of '{key}' failed: {message}")]
    Delete { key: String, message: String },
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// A GET URL for `key` that stops working after `expires_in`.
    async fn presigned_get_url(&self, key: &str, expires_in: Duration)
        -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Deletes `key`, logging a warning instead of failing.
pub async fn delete_best_effort(storage: &dyn FileStorage, key: &str) {
    match storage.delete(key).await {
        Ok(()) => info!("Deleted stored object {key}"),
        Err(e) => warn!("Ignoring storage delete failure: {e}"),
    }
}

/// A presigned download link and the moment it stops working.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// `ttl_secs` is clamped to what S3 will presign.
pub async fn signed_url(
    storage: &dyn FileStorage,
    key: &str,
    ttl_secs: u64,
) -> Result<SignedUrl, StorageError> {
    let ttl_secs = ttl_secs.clamp(1, MAX_SIGNED_URL_TTL_SECS);
    let issued_at = Utc::now();
    let url = storage
        .presigned_get_url(key, Duration::from_secs(ttl_secs))
        .await?;
    Ok(SignedUrl {
        url,
        expires_at: issued_at + chrono::Duration::seconds(ttl_secs as i64),
    })
}

/// `{prefix}/{user_id}/{unix_millis}-{random}-{file_name}`
pub fn object_key(prefix: &str, user_id: &str, file_name: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}/{}/{}-{}-{}",
        sanitize_segment(user_id),
        now.timestamp_millis(),
        &random[..8],
        sanitize_segment(file_name)
    )
}

/// Keeps `[A-Za-z0-9._-]`, replaces everything else with `-`.
fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_FILE_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
