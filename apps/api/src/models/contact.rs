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
    ContactStatus, "contact status" {
        #[default]
        NotContacted => "not_contacted",
        ReachedOut => "reached_out",
        Replied => "replied",
        Connected => "connected",
        MeetingScheduled => "meeting_scheduled",
        NotInterested => "not_interested",
    }
}

text_enum! {
    InteractionType, "interaction type" {
        Messaged => "messaged",
        Replied => "replied",
        ScheduledCall => "scheduled_call",
        Met => "met",
        Connected => "connected",
        Note => "note",
    }
}

impl InteractionType {
    /// Whether logging this interaction counts as contacting the person.
    pub fn touches_contact(&self) -> bool {
        !matches!(self, InteractionType::Note)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub name: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub link: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ContactStatus,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactInteraction {
    pub id: Uuid,
    pub contact_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub interaction_type: InteractionType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactReminder {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub name: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub link: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

impl CreateContactRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            company: normalize(self.company),
            role: normalize(self.role),
            link: normalize(self.link),
            email: normalize(self.email),
            notes: normalize(self.notes),
            ..self
        }
    }
}

impl Validate for CreateContactRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.required("name", &self.name, MAX_SHORT_TEXT);
        errors.optional("company", self.company.as_deref(), MAX_SHORT_TEXT);
        errors.optional("role", self.role.as_deref(), MAX_SHORT_TEXT);
        errors.optional_url("link", self.link.as_deref());
        errors.optional_email("email", self.email.as_deref());
        errors.optional("notes", self.notes.as_deref(), MAX_LONG_TEXT);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub status: Option<ContactStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_contacted_at: Option<Option<DateTime<Utc>>>,
}

impl Validate for UpdateContactRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        if let Some(name) = &self.name {
            errors.required("name", name, MAX_SHORT_TEXT);
        }
        errors.optional(
            "company",
            self.company.as_ref().and_then(Option::as_deref),
            MAX_SHORT_TEXT,
        );
        errors.optional(
            "role",
            self.role.as_ref().and_then(Option::as_deref),
            MAX_SHORT_TEXT,
        );
        errors.optional_url("link", self.link.as_ref().and_then(Option::as_deref));
        errors.optional_email("email", self.email.as_ref().and_then(Option::as_deref));
        errors.optional(
            "notes",
            self.notes.as_ref().and_then(Option::as_deref),
            MAX_LONG_TEXT,
        );
        errors.into_result()
    }
}

impl UpdateContactRequest {
    pub fn apply(&self, contact: &mut Contact, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            contact.name = name.trim().to_string();
        }
        if let Some(company) = &self.company {
            contact.company = normalize(company.clone());
        }
        if let Some(role) = &self.role {
            contact.role = normalize(role.clone());
        }
        if let Some(link) = &self.link {
            contact.link = normalize(link.clone());
        }
        if let Some(email) = &self.email {
            contact.email = normalize(email.clone());
        }
        if let Some(notes) = &self.notes {
            contact.notes = normalize(notes.clone());
        }
        if let Some(status) = self.status {
            contact.status = status;
        }
        if let Some(last_contacted_at) = self.last_contacted_at {
            contact.last_contacted_at = last_contacted_at;
        }
        contact.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInteractionRequest {
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub notes: Option<String>,
}

impl Validate for CreateInteractionRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.optional("notes", self.notes.as_deref(), MAX_LONG_TEXT);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
}

impl Validate for CreateReminderRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.required("title", &self.title, MAX_SHORT_TEXT);
        errors.optional("description", self.description.as_deref(), MAX_LONG_TEXT);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

impl Validate for UpdateReminderRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        if let Some(title) = &self.title {
            errors.required("title", title, MAX_SHORT_TEXT);
        }
        errors.optional(
            "description",
            self.description.as_ref().and_then(Option::as_deref),
            MAX_LONG_TEXT,
        );
        errors.into_result()
    }
}

impl UpdateReminderRequest {
    pub fn apply(&self, reminder: &mut ContactReminder, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            reminder.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            reminder.description = normalize(description.clone());
        }
        if let Some(due_date) = self.due_date {
            reminder.due_date = due_date;
        }
        if let Some(completed) = self.completed {
            reminder.completed = completed;
        }
        reminder.updated_at = now;
    }
}
