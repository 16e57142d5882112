//! Plain-text extraction from uploaded resumes.
//!
//! PDF parsing is CPU-bound and `pdf-extract` can panic on malformed input, so it runs
//! inside `spawn_blocking`; a panic surfaces as a `JoinError` and becomes a 400.

use bytes::Bytes;
use tracing::warn;

use crate::errors::AppError;
use crate::storage::upload::UploadedFile;

pub async fn extract_text(upload: &UploadedFile) -> Result<String, AppError> {
    if upload.is_pdf() {
        return extract_pdf(upload.bytes.clone()).await;
    }
    if upload.is_plain_text() {
        return String::from_utf8(upload.bytes.to_vec())
            .map(|text| text.trim().to_string())
            .map_err(|_| AppError::BadRequest("Text resume must be UTF-8".to_string()));
    }
    Err(AppError::BadRequest(format!(
        "Unsupported resume type '{}'; upload a PDF or plain-text file",
        upload.content_type
    )))
}

async fn extract_pdf(bytes: Bytes) -> Result<String, AppError> {
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!("PDF extraction panicked: {e}");
            AppError::BadRequest("Could not read PDF".to_string())
        })?;

    match result {
        Ok(text) => Ok(text.trim().to_string()),
        Err(e) => {
            warn!("PDF extraction failed: {e}");
            Err(AppError::BadRequest("Could not read PDF".to_string()))
        }
    }
}
