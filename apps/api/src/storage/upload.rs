use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// The `file` part of a multipart upload, plus the optional `name` text part.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub display_name: Option<String>,
}

impl UploadedFile {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf" || self.extension().as_deref() == Some("pdf")
    }

    pub fn is_plain_text(&self) -> bool {
        self.content_type.starts_with("text/plain")
            || matches!(self.extension().as_deref(), Some("txt" | "md"))
    }
}

/// Reads the upload, rejecting missing, empty or oversized files with a 400.
pub async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<UploadedFile, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut display_name = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let declared = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let content_type = declared
                    .filter(|ct| ct != "application/octet-stream")
                    .unwrap_or_else(|| guess_content_type(&file_name).to_string());
                file = Some((file_name, content_type, bytes));
            }
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                display_name = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::BadRequest(format!(
            "Uploaded file exceeds {max_bytes} bytes"
        )));
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
        display_name,
    })
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}
