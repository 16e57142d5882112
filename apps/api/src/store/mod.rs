//! Ownership-scoped data access.
//!
//! Every method takes the authenticated user's id and only ever sees that user's rows,
//! directly or through the parent Job/Contact. Lookups return `Option`; handlers turn
//! `None` into a 404 so "missing" and "not yours" look the same from outside.

pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::contact::{
    Contact, ContactInteraction, ContactReminder, CreateContactRequest, CreateInteractionRequest,
    CreateReminderRequest,
};
use crate::models::job::{
    ChatMessage, ChatRole, CreateJobRequest, JobApplication, NewSuggestion, Suggestion,
};
use crate::models::resume::{NewResume, Resume};
use crate::models::user::User;

pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the row on first sight; refreshes profile fields if they changed.
    async fn upsert_user(&self, user: &AuthUser) -> StoreResult<User>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn list_jobs(&self, user_id: &str) -> StoreResult<Vec<JobApplication>>;

    async fn get_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>>;

    /// Inserts the job and, if `resume_id` is set, its resume link.
    async fn create_job(&self, user_id: &str, job: CreateJobRequest)
        -> StoreResult<JobApplication>;

    /// Writes back a modified row. With `replace_resume`, the resume link is deleted and
    /// re-inserted from `job.resume_id`.
    async fn update_job(
        &self,
        user_id: &str,
        job: &JobApplication,
        replace_resume: bool,
    ) -> StoreResult<Option<JobApplication>>;

    /// Deletes the job with its chat messages, suggestions and resume links.
    /// Returns the deleted row so callers can clean up attached files.
    async fn delete_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>>;

    async fn list_chat_messages(&self, user_id: &str, job_id: Uuid)
        -> StoreResult<Vec<ChatMessage>>;

    async fn add_chat_message(
        &self,
        user_id: &str,
        job_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> StoreResult<Option<ChatMessage>>;

    async fn list_suggestions(&self, user_id: &str, job_id: Uuid) -> StoreResult<Vec<Suggestion>>;

    /// Drops the job's existing suggestions and stores the new set.
    async fn replace_suggestions(
        &self,
        user_id: &str,
        job_id: Uuid,
        resume_id: Option<Uuid>,
        suggestions: &[NewSuggestion],
    ) -> StoreResult<Option<Vec<Suggestion>>>;
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn list_resumes(&self, user_id: &str) -> StoreResult<Vec<Resume>>;

    async fn get_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>>;

    async fn create_resume(&self, user_id: &str, resume: NewResume) -> StoreResult<Resume>;

    async fn delete_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list_contacts(&self, user_id: &str) -> StoreResult<Vec<Contact>>;

    async fn get_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<Option<Contact>>;

    async fn create_contact(
        &self,
        user_id: &str,
        contact: CreateContactRequest,
    ) -> StoreResult<Contact>;

    async fn update_contact(&self, user_id: &str, contact: &Contact)
        -> StoreResult<Option<Contact>>;

    /// Interactions and reminders go with it.
    async fn delete_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<bool>;

    async fn list_interactions(
        &self,
        user_id: &str,
        contact_id: Uuid,
    ) -> StoreResult<Vec<ContactInteraction>>;

    /// Records the interaction; contact-touching types also stamp the contact's
    /// `last_contacted_at` with the interaction time.
    async fn create_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction: CreateInteractionRequest,
    ) -> StoreResult<Option<ContactInteraction>>;

    async fn delete_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction_id: Uuid,
    ) -> StoreResult<bool>;

    async fn list_reminders(&self, user_id: &str, contact_id: Uuid)
        -> StoreResult<Vec<ContactReminder>>;

    /// Reminders across all of the user's contacts, soonest first.
    async fn list_user_reminders(
        &self,
        user_id: &str,
        include_completed: bool,
    ) -> StoreResult<Vec<ContactReminder>>;

    async fn get_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<Option<ContactReminder>>;

    async fn create_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder: CreateReminderRequest,
    ) -> StoreResult<Option<ContactReminder>>;

    async fn update_reminder(
        &self,
        user_id: &str,
        reminder: &ContactReminder,
    ) -> StoreResult<Option<ContactReminder>>;

    async fn delete_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<bool>;
}

/// Everything the handlers need. Carried in `AppState` as `Arc<dyn Store>`.
pub trait Store: UserStore + JobStore + ResumeStore + ContactStore {}

impl<T> Store for T where T: UserStore + JobStore + ResumeStore + ContactStore {}
