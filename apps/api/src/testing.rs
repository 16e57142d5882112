//! Test doubles and request builders shared by the handler tests.
//!
//! Tokens are HS256-signed with a fixed octet key and checked by the real `OidcProvider`
//! verifier; storage, database and the assistant are in-memory fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use chrono::Utc;
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use crate::assistant::{Analysis, ResumeAssistant};
use crate::auth::provider::{
    AuthError, IdentityProvider, OidcProvider, TokenClaims, TokenKind, TokenSet,
};
use crate::auth::AuthUser;
use crate::config::{AuthConfig, Config};
use crate::errors::AppError;
use crate::models::contact::{
    Contact, ContactInteraction, ContactReminder, CreateContactRequest, CreateInteractionRequest,
    CreateReminderRequest,
};
use crate::models::job::{
    ChatMessage, ChatRole, CreateJobRequest, JobApplication, JobStatus, NewSuggestion, Suggestion,
};
use crate::models::resume::{NewResume, Resume};
use crate::models::user::User;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{FileStorage, StorageError};
use crate::store::{ContactStore, JobStore, ResumeStore, StoreResult, UserStore};
use crate::validation::normalize;

pub const TEST_ISSUER: &str = "https://idp.test.example/pool";
pub const TEST_CLIENT_ID: &str = "jobtrack-test-client";
const TEST_KID: &str = "test-key";
const TEST_SECRET: &[u8] = b"jobtrack-hmac-key-for-unit-tests!";
const TEST_JWKS: &str = r#"{"keys": [{"kty": "oct", "kid": "test-key", "alg": "HS256", "k": "am9idHJhY2staG1hYy1rZXktZm9yLXVuaXQtdGVzdHMh"}]}"#;
const BOUNDARY: &str = "jobtrack-test-boundary";

// ─── Tokens ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TestClaims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub token_use: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl TestClaims {
    pub fn access(sub: &str) -> Self {
        Self {
            sub: sub.to_string(),
            iss: TEST_ISSUER.to_string(),
            exp: Utc::now().timestamp() + 3600,
            aud: None,
            token_use: "access".to_string(),
            email: None,
            name: None,
            email_verified: None,
        }
    }

    pub fn identity(sub: &str) -> Self {
        Self {
            aud: Some(TEST_CLIENT_ID.to_string()),
            token_use: "id".to_string(),
            email: Some(format!("{sub}@example.com")),
            name: Some(format!("Test {sub}")),
            email_verified: Some(true),
            ..Self::access(sub)
        }
    }
}

pub fn sign_token(claims: &TestClaims) -> String {
    sign_token_with_kid(claims, TEST_KID)
}

/// Signs with the test secret but names `kid` in the header.
pub fn sign_token_with_kid(claims: &TestClaims, kid: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/jobtrack_test".to_string(),
        s3_bucket: "jobtrack-test".to_string(),
        s3_endpoint: None,
        s3_region: "us-east-1".to_string(),
        aws_access_key_id: None,
        aws_secret_access_key: None,
        anthropic_api_key: "sk-test".to_string(),
        auth: AuthConfig {
            // Nothing listens here, so a JWKS refresh always fails.
            jwks_url: "http://127.0.0.1:9/jwks.json".to_string(),
            issuer: TEST_ISSUER.to_string(),
            client_id: TEST_CLIENT_ID.to_string(),
            client_secret: None,
            authorize_url: "https://idp.test.example/oauth2/authorize".to_string(),
            token_url: "http://127.0.0.1:9/oauth2/token".to_string(),
            redirect_uri: "http://localhost:8080/api/auth/callback".to_string(),
            access_cookie: "access_token".to_string(),
            id_cookie: "id_token".to_string(),
            cookie_secure: false,
            post_login_redirect: "/".to_string(),
        },
        signed_url_ttl_secs: 900,
        max_upload_bytes: 1024 * 1024,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

pub fn test_provider() -> OidcProvider {
    let keys: JwkSet = serde_json::from_str(TEST_JWKS).unwrap();
    OidcProvider::with_keys(reqwest::Client::new(), test_config().auth, keys)
}

/// Real verification; the code exchange mints tokens for `sub = code`.
pub struct TestIdentity {
    verifier: OidcProvider,
}

#[async_trait]
impl IdentityProvider for TestIdentity {
    async fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, AuthError> {
        self.verifier.verify(token, kind).await
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        Ok(TokenSet {
            access_token: sign_token(&TestClaims::access(code)),
            id_token: sign_token(&TestClaims::identity(code)),
        })
    }
}

// ─── Store ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    jobs: Vec<JobApplication>,
    resume_links: Vec<(Uuid, Uuid)>,
    chat: Vec<ChatMessage>,
    suggestions: Vec<Suggestion>,
    resumes: Vec<Resume>,
    contacts: Vec<Contact>,
    interactions: Vec<ContactInteraction>,
    reminders: Vec<ContactReminder>,
}

impl Tables {
    fn job(&self, user_id: &str, job_id: Uuid) -> Option<JobApplication> {
        self.jobs
            .iter()
            .find(|j| j.id == job_id && j.user_id == user_id)
            .map(|j| self.hydrate(j.clone()))
    }

    fn hydrate(&self, mut job: JobApplication) -> JobApplication {
        job.resume_id = self
            .resume_links
            .iter()
            .rev()
            .find(|(job_id, _)| *job_id == job.id)
            .map(|(_, resume_id)| *resume_id);
        job
    }

    fn owns_contact(&self, user_id: &str, contact_id: Uuid) -> bool {
        self.contacts
            .iter()
            .any(|c| c.id == contact_id && c.user_id == user_id)
    }

    fn owned_contact_ids(&self, user_id: &str) -> Vec<Uuid> {
        self.contacts
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect()
    }
}

/// In-memory `Store` with the same ownership rules as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub async fn has_user(&self, user_id: &str) -> bool {
        self.tables.lock().await.users.contains_key(user_id)
    }

    /// Chat messages, suggestions and resume links still pointing at `job_id`.
    pub async fn job_child_rows(&self, job_id: Uuid) -> usize {
        let tables = self.tables.lock().await;
        tables.chat.iter().filter(|m| m.job_id == job_id).count()
            + tables.suggestions.iter().filter(|s| s.job_id == job_id).count()
            + tables
                .resume_links
                .iter()
                .filter(|(j, _)| *j == job_id)
                .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, user: &AuthUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let row = tables.users.entry(user.id.clone()).or_insert_with(|| User {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            email_verified: user.email_verified,
            created_at: now,
            updated_at: now,
        });
        if (&row.email, &row.name, row.email_verified)
            != (&user.email, &user.name, user.email_verified)
        {
            row.email = user.email.clone();
            row.name = user.name.clone();
            row.email_verified = user.email_verified;
            row.updated_at = now;
        }
        Ok(row.clone())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn list_jobs(&self, user_id: &str) -> StoreResult<Vec<JobApplication>> {
        let tables = self.tables.lock().await;
        let mut jobs: Vec<_> = tables
            .jobs
            .iter()
            .filter(|j| j.user_id == user_id)
            .map(|j| tables.hydrate(j.clone()))
            .collect();
        jobs.sort_by_key(|j| std::cmp::Reverse(j.created_at));
        Ok(jobs)
    }

    async fn get_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>> {
        Ok(self.tables.lock().await.job(user_id, job_id))
    }

    async fn create_job(&self, user_id: &str, job: CreateJobRequest) -> StoreResult<JobApplication> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let row = JobApplication {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            company: job.company,
            role: job.role,
            location: job.location,
            job_url: job.job_url,
            description: job.description,
            notes: job.notes,
            status: job.status,
            resume_file_key: None,
            cover_letter_file_key: None,
            applied_at: (job.status == JobStatus::Applied).then_some(now),
            resume_id: None,
            created_at: now,
            updated_at: now,
        };
        if let Some(resume_id) = job.resume_id {
            tables.resume_links.push((row.id, resume_id));
        }
        tables.jobs.push(row.clone());
        Ok(tables.hydrate(row))
    }

    async fn update_job(
        &self,
        user_id: &str,
        job: &JobApplication,
        replace_resume: bool,
    ) -> StoreResult<Option<JobApplication>> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == job.id && j.user_id == user_id)
        else {
            return Ok(None);
        };
        *row = JobApplication {
            id: row.id,
            user_id: row.user_id.clone(),
            created_at: row.created_at,
            ..job.clone()
        };
        if replace_resume {
            tables.resume_links.retain(|(j, _)| *j != job.id);
            if let Some(resume_id) = job.resume_id {
                tables.resume_links.push((job.id, resume_id));
            }
        }
        Ok(tables.job(user_id, job.id))
    }

    async fn delete_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>> {
        let mut tables = self.tables.lock().await;
        let Some(job) = tables.job(user_id, job_id) else {
            return Ok(None);
        };
        tables.jobs.retain(|j| j.id != job_id);
        tables.chat.retain(|m| m.job_id != job_id);
        tables.suggestions.retain(|s| s.job_id != job_id);
        tables.resume_links.retain(|(j, _)| *j != job_id);
        Ok(Some(job))
    }

    async fn list_chat_messages(&self, user_id: &str, job_id: Uuid) -> StoreResult<Vec<ChatMessage>> {
        let tables = self.tables.lock().await;
        if tables.job(user_id, job_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(tables
            .chat
            .iter()
            .filter(|m| m.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn add_chat_message(
        &self,
        user_id: &str,
        job_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> StoreResult<Option<ChatMessage>> {
        let mut tables = self.tables.lock().await;
        if tables.job(user_id, job_id).is_none() {
            return Ok(None);
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            job_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.chat.push(message.clone());
        Ok(Some(message))
    }

    async fn list_suggestions(&self, user_id: &str, job_id: Uuid) -> StoreResult<Vec<Suggestion>> {
        let tables = self.tables.lock().await;
        if tables.job(user_id, job_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(tables
            .suggestions
            .iter()
            .filter(|s| s.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn replace_suggestions(
        &self,
        user_id: &str,
        job_id: Uuid,
        resume_id: Option<Uuid>,
        suggestions: &[NewSuggestion],
    ) -> StoreResult<Option<Vec<Suggestion>>> {
        let mut tables = self.tables.lock().await;
        if tables.job(user_id, job_id).is_none() {
            return Ok(None);
        }
        tables.suggestions.retain(|s| s.job_id != job_id);
        let now = Utc::now();
        let created: Vec<Suggestion> = suggestions
            .iter()
            .map(|s| Suggestion {
                id: Uuid::new_v4(),
                job_id,
                resume_id,
                category: s.category.clone(),
                content: s.content.clone(),
                created_at: now,
            })
            .collect();
        tables.suggestions.extend(created.iter().cloned());
        Ok(Some(created))
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn list_resumes(&self, user_id: &str) -> StoreResult<Vec<Resume>> {
        let tables = self.tables.lock().await;
        let mut resumes: Vec<_> = tables
            .resumes
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        resumes.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(resumes)
    }

    async fn get_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .resumes
            .iter()
            .find(|r| r.id == resume_id && r.user_id == user_id)
            .cloned())
    }

    async fn create_resume(&self, user_id: &str, resume: NewResume) -> StoreResult<Resume> {
        let row = Resume {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: resume.name,
            file_key: resume.file_key,
            content_type: resume.content_type,
            size_bytes: resume.size_bytes,
            text_content: resume.text_content,
            created_at: Utc::now(),
        };
        self.tables.lock().await.resumes.push(row.clone());
        Ok(row)
    }

    async fn delete_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>> {
        let mut tables = self.tables.lock().await;
        let Some(index) = tables
            .resumes
            .iter()
            .position(|r| r.id == resume_id && r.user_id == user_id)
        else {
            return Ok(None);
        };
        tables.resume_links.retain(|(_, r)| *r != resume_id);
        Ok(Some(tables.resumes.remove(index)))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, user_id: &str) -> StoreResult<Vec<Contact>> {
        let tables = self.tables.lock().await;
        let mut contacts: Vec<_> = tables
            .contacts
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        contacts.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        Ok(contacts)
    }

    async fn get_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<Option<Contact>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .contacts
            .iter()
            .find(|c| c.id == contact_id && c.user_id == user_id)
            .cloned())
    }

    async fn create_contact(&self, user_id: &str, contact: CreateContactRequest) -> StoreResult<Contact> {
        let now = Utc::now();
        let row = Contact {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: contact.name,
            company: contact.company,
            role: contact.role,
            link: contact.link,
            email: contact.email,
            notes: contact.notes,
            status: contact.status,
            last_contacted_at: contact.last_contacted_at,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.contacts.push(row.clone());
        Ok(row)
    }

    async fn update_contact(&self, user_id: &str, contact: &Contact) -> StoreResult<Option<Contact>> {
        let mut tables = self.tables.lock().await;
        let Some(row) = tables
            .contacts
            .iter_mut()
            .find(|c| c.id == contact.id && c.user_id == user_id)
        else {
            return Ok(None);
        };
        *row = Contact {
            user_id: row.user_id.clone(),
            created_at: row.created_at,
            ..contact.clone()
        };
        Ok(Some(row.clone()))
    }

    async fn delete_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(false);
        }
        tables.contacts.retain(|c| c.id != contact_id);
        tables.interactions.retain(|i| i.contact_id != contact_id);
        tables.reminders.retain(|r| r.contact_id != contact_id);
        Ok(true)
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        contact_id: Uuid,
    ) -> StoreResult<Vec<ContactInteraction>> {
        let tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(Vec::new());
        }
        Ok(tables
            .interactions
            .iter()
            .rev()
            .filter(|i| i.contact_id == contact_id)
            .cloned()
            .collect())
    }

    async fn create_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction: CreateInteractionRequest,
    ) -> StoreResult<Option<ContactInteraction>> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(None);
        }
        let created = ContactInteraction {
            id: Uuid::new_v4(),
            contact_id,
            interaction_type: interaction.interaction_type,
            notes: interaction.notes,
            created_at: Utc::now(),
        };
        if created.interaction_type.touches_contact() {
            if let Some(contact) = tables.contacts.iter_mut().find(|c| c.id == contact_id) {
                contact.last_contacted_at = Some(created.created_at);
                contact.updated_at = created.created_at;
            }
        }
        tables.interactions.push(created.clone());
        Ok(Some(created))
    }

    async fn delete_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(false);
        }
        let before = tables.interactions.len();
        tables
            .interactions
            .retain(|i| !(i.id == interaction_id && i.contact_id == contact_id));
        Ok(tables.interactions.len() < before)
    }

    async fn list_reminders(&self, user_id: &str, contact_id: Uuid) -> StoreResult<Vec<ContactReminder>> {
        let tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(Vec::new());
        }
        let mut reminders: Vec<_> = tables
            .reminders
            .iter()
            .filter(|r| r.contact_id == contact_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.due_date);
        Ok(reminders)
    }

    async fn list_user_reminders(
        &self,
        user_id: &str,
        include_completed: bool,
    ) -> StoreResult<Vec<ContactReminder>> {
        let tables = self.tables.lock().await;
        let owned = tables.owned_contact_ids(user_id);
        let mut reminders: Vec<_> = tables
            .reminders
            .iter()
            .filter(|r| owned.contains(&r.contact_id) && (include_completed || !r.completed))
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.due_date);
        Ok(reminders)
    }

    async fn get_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<Option<ContactReminder>> {
        let tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(None);
        }
        Ok(tables
            .reminders
            .iter()
            .find(|r| r.id == reminder_id && r.contact_id == contact_id)
            .cloned())
    }

    async fn create_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder: CreateReminderRequest,
    ) -> StoreResult<Option<ContactReminder>> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(None);
        }
        let now = Utc::now();
        let row = ContactReminder {
            id: Uuid::new_v4(),
            contact_id,
            title: reminder.title.trim().to_string(),
            description: normalize(reminder.description),
            due_date: reminder.due_date,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        tables.reminders.push(row.clone());
        Ok(Some(row))
    }

    async fn update_reminder(
        &self,
        user_id: &str,
        reminder: &ContactReminder,
    ) -> StoreResult<Option<ContactReminder>> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, reminder.contact_id) {
            return Ok(None);
        }
        let Some(row) = tables
            .reminders
            .iter_mut()
            .find(|r| r.id == reminder.id && r.contact_id == reminder.contact_id)
        else {
            return Ok(None);
        };
        *row = ContactReminder {
            created_at: row.created_at,
            ..reminder.clone()
        };
        Ok(Some(row.clone()))
    }

    async fn delete_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.owns_contact(user_id, contact_id) {
            return Ok(false);
        }
        let before = tables.reminders.len();
        tables
            .reminders
            .retain(|r| !(r.id == reminder_id && r.contact_id == contact_id));
        Ok(tables.reminders.len() < before)
    }
}

// ─── File storage ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryFiles {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    fail_deletes: AtomicBool,
}

impl MemoryFiles {
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl FileStorage for MemoryFiles {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn presigned_get_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        Ok(format!("memory://{key}?expires_in={}", expires_in.as_secs()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Delete {
                key: key.to_string(),
                message: "simulated outage".to_string(),
            });
        }
        self.objects.lock().await.remove(key);
        Ok(())
    }
}

// ─── Assistant ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedAssistant {
    fail: AtomicBool,
    last_resume_text: Mutex<Option<String>>,
    last_history_len: AtomicUsize,
}

impl ScriptedAssistant {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn last_resume_text(&self) -> Option<String> {
        self.last_resume_text.lock().await.clone()
    }

    pub async fn last_history_len(&self) -> usize {
        self.last_history_len.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Llm("scripted failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResumeAssistant for ScriptedAssistant {
    async fn analyze(&self, _job: &JobApplication, resume_text: &str) -> Result<Analysis, AppError> {
        self.check()?;
        *self.last_resume_text.lock().await = Some(resume_text.to_string());
        Ok(Analysis {
            match_score: 80,
            summary: "Good fit".to_string(),
            suggestions: vec![
                NewSuggestion {
                    category: "skills".to_string(),
                    content: "Lead with the Rust work.".to_string(),
                },
                NewSuggestion {
                    category: "keywords".to_string(),
                    content: "Mention Kubernetes.".to_string(),
                },
            ],
        })
    }

    async fn chat(
        &self,
        _job: &JobApplication,
        _resume_text: Option<&str>,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AppError> {
        self.check()?;
        self.last_history_len.store(history.len(), Ordering::SeqCst);
        Ok(format!("Echo: {message}"))
    }
}

// ─── Router harness ─────────────────────────────────────────────────────────

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub files: Arc<MemoryFiles>,
    pub assistant: Arc<ScriptedAssistant>,
    identity: Arc<TestIdentity>,
    config: Config,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            files: Arc::new(MemoryFiles::default()),
            assistant: Arc::new(ScriptedAssistant::default()),
            identity: Arc::new(TestIdentity {
                verifier: test_provider(),
            }),
            config: test_config(),
        }
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            store: self.store.clone(),
            files: self.files.clone(),
            identity: self.identity.clone(),
            assistant: self.assistant.clone(),
            config: self.config.clone(),
        })
    }

    fn cookies(&self, user: &str) -> String {
        format!(
            "{}={}; {}={}",
            self.config.auth.access_cookie,
            sign_token(&TestClaims::access(user)),
            self.config.auth.id_cookie,
            sign_token(&TestClaims::identity(user)),
        )
    }

    fn request(&self, method: &str, uri: &str, user: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, self.cookies(user))
    }

    pub fn get(&self, uri: &str, user: &str) -> Request<Body> {
        self.request("GET", uri, user).body(Body::empty()).unwrap()
    }

    pub fn delete(&self, uri: &str, user: &str) -> Request<Body> {
        self.request("DELETE", uri, user).body(Body::empty()).unwrap()
    }

    pub fn post_empty(&self, uri: &str, user: &str) -> Request<Body> {
        self.request("POST", uri, user).body(Body::empty()).unwrap()
    }

    pub fn post_json(&self, uri: &str, user: &str, body: Value) -> Request<Body> {
        self.json_request("POST", uri, user, body)
    }

    pub fn patch_json(&self, uri: &str, user: &str, body: Value) -> Request<Body> {
        self.json_request("PATCH", uri, user, body)
    }

    fn json_request(&self, method: &str, uri: &str, user: &str, body: Value) -> Request<Body> {
        self.request(method, uri, user)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// A request with a JSON body and no cookies.
    pub fn anonymous(&self, method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    }

    /// A `multipart/form-data` request with a single `file` part.
    pub fn upload(
        &self,
        uri: &str,
        user: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        self.request("POST", uri, user)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    /// Sends the request and returns the status with the JSON body (`Null` when empty).
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Uploads a plain-text resume and returns its id.
    pub async fn upload_text_resume(&self, user: &str, text: &str) -> String {
        let (status, body) = self
            .call(self.upload("/api/resumes", user, "resume.txt", "text/plain", text.as_bytes()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["resume"]["id"].as_str().unwrap().to_string()
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
