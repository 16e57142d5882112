use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;
use crate::errors::AppError;
use crate::validation::{
    double_option, normalize, FieldErrors, Validate, MAX_LONG_TEXT, MAX_SHORT_TEXT,
};

text_enum! {
    #[derive(Default)]
    JobStatus, "job status" {
        #[default]
        Saved => "saved",
        Applied => "applied",
        Interviewing => "interviewing",
        Offer => "offer",
        Rejected => "rejected",
    }
}

text_enum! {
    ChatRole, "chat role" {
        User => "user",
        Assistant => "assistant",
    }
}

/// Files a job application can carry, addressed by the `:kind` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Resume,
    CoverLetter,
}

impl FileKind {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            FileKind::Resume => "job-resumes",
            FileKind::CoverLetter => "cover-letters",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Resume => "Resume file",
            FileKind::CoverLetter => "Cover letter file",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub resume_file_key: Option<String>,
    pub cover_letter_file_key: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
    /// The resume linked through `job_resume_used`, if any.
    pub resume_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn file_key(&self, kind: FileKind) -> Option<&str> {
        match kind {
            FileKind::Resume => self.resume_file_key.as_deref(),
            FileKind::CoverLetter => self.cover_letter_file_key.as_deref(),
        }
    }

    pub fn set_file_key(&mut self, kind: FileKind, key: Option<String>) {
        match kind {
            FileKind::Resume => self.resume_file_key = key,
            FileKind::CoverLetter => self.cover_letter_file_key = key,
        }
    }

    /// Keys of every stored object attached to this job.
    pub fn file_keys(&self) -> Vec<&str> {
        [FileKind::Resume, FileKind::CoverLetter]
            .into_iter()
            .filter_map(|kind| self.file_key(kind))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub job_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub category: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A suggestion produced by resume analysis, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSuggestion {
    pub category: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub company: String,
    pub role: String,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    pub resume_id: Option<Uuid>,
}

impl CreateJobRequest {
    pub fn normalized(self) -> Self {
        Self {
            company: self.company.trim().to_string(),
            role: self.role.trim().to_string(),
            location: normalize(self.location),
            job_url: normalize(self.job_url),
            description: normalize(self.description),
            notes: normalize(self.notes),
            ..self
        }
    }
}

impl Validate for CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.required("company", &self.company, MAX_SHORT_TEXT);
        errors.required("role", &self.role, MAX_SHORT_TEXT);
        errors.optional("location", self.location.as_deref(), MAX_SHORT_TEXT);
        errors.optional_url("jobUrl", self.job_url.as_deref());
        errors.optional("description", self.description.as_deref(), MAX_LONG_TEXT);
        errors.optional("notes", self.notes.as_deref(), MAX_LONG_TEXT);
        errors.into_result()
    }
}

/// Partial update. Outer `None` = leave as is; `Some(None)` = clear.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub company: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub job_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub resume_id: Option<Option<Uuid>>,
}

impl Validate for UpdateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        if let Some(company) = &self.company {
            errors.required("company", company, MAX_SHORT_TEXT);
        }
        if let Some(role) = &self.role {
            errors.required("role", role, MAX_SHORT_TEXT);
        }
        errors.optional("location", self.location.as_ref().and_then(Option::as_deref), MAX_SHORT_TEXT);
        errors.optional_url("jobUrl", self.job_url.as_ref().and_then(Option::as_deref));
        errors.optional(
            "description",
            self.description.as_ref().and_then(Option::as_deref),
            MAX_LONG_TEXT,
        );
        errors.optional("notes", self.notes.as_ref().and_then(Option::as_deref), MAX_LONG_TEXT);
        errors.into_result()
    }
}

impl UpdateJobRequest {
    /// Applies the patch to a fetched row. The resume link is handled by the store.
    pub fn apply(&self, job: &mut JobApplication, now: DateTime<Utc>) {
        if let Some(company) = &self.company {
            job.company = company.trim().to_string();
        }
        if let Some(role) = &self.role {
            job.role = role.trim().to_string();
        }
        if let Some(location) = &self.location {
            job.location = normalize(location.clone());
        }
        if let Some(job_url) = &self.job_url {
            job.job_url = normalize(job_url.clone());
        }
        if let Some(description) = &self.description {
            job.description = normalize(description.clone());
        }
        if let Some(notes) = &self.notes {
            job.notes = normalize(notes.clone());
        }
        if let Some(status) = self.status {
            if status == JobStatus::Applied && job.applied_at.is_none() {
                job.applied_at = Some(now);
            }
            job.status = status;
        }
        if let Some(resume_id) = self.resume_id {
            job.resume_id = resume_id;
        }
        job.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub const MAX_CHAT_MESSAGE: usize = 4000;

impl Validate for ChatRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.required("message", &self.message, MAX_CHAT_MESSAGE);
        errors.into_result()
    }
}
