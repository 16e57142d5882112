use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ContactStore, JobStore, ResumeStore, StoreResult, UserStore};
use crate::auth::AuthUser;
use crate::models::contact::{
    Contact, ContactInteraction, ContactReminder, CreateContactRequest, CreateInteractionRequest,
    CreateReminderRequest,
};
use crate::models::job::{
    ChatMessage, ChatRole, CreateJobRequest, JobApplication, JobStatus, NewSuggestion, Suggestion,
};
use crate::models::resume::{NewResume, Resume};
use crate::models::user::User;

/// PostgreSQL-backed store. Multi-row writes run in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Job rows plus the linked resume from `job_resume_used`.
fn job_query(filter: &str) -> String {
    format!(
        r#"
        SELECT j.id, j.user_id, j.company, j.role, j.location, j.job_url, j.description,
               j.notes, j.status, j.resume_file_key, j.cover_letter_file_key, j.applied_at,
               j.created_at, j.updated_at,
               (SELECT u.resume_id FROM job_resume_used u
                 WHERE u.job_id = j.id
                 ORDER BY u.created_at DESC
                 LIMIT 1) AS resume_id
        FROM job_applications j
        {filter}
        "#
    )
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_user(&self, user: &AuthUser) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, email_verified)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
               SET email = EXCLUDED.email,
                   name = EXCLUDED.name,
                   email_verified = EXCLUDED.email_verified,
                   updated_at = NOW()
             WHERE (users.email, users.name, users.email_verified)
                   IS DISTINCT FROM (EXCLUDED.email, EXCLUDED.name, EXCLUDED.email_verified)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.email_verified)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(&user.id)
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn list_jobs(&self, user_id: &str) -> StoreResult<Vec<JobApplication>> {
        let sql = job_query("WHERE j.user_id = $1 ORDER BY j.created_at DESC");
        sqlx::query_as::<_, JobApplication>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>> {
        let sql = job_query("WHERE j.id = $1 AND j.user_id = $2");
        sqlx::query_as::<_, JobApplication>(&sql)
            .bind(job_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_job(
        &self,
        user_id: &str,
        job: CreateJobRequest,
    ) -> StoreResult<JobApplication> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let applied_at = (job.status == JobStatus::Applied).then_some(now);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO job_applications
                (id, user_id, company, role, location, job_url, description, notes,
                 status, applied_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&job.company)
        .bind(&job.role)
        .bind(&job.location)
        .bind(&job.job_url)
        .bind(&job.description)
        .bind(&job.notes)
        .bind(job.status.as_str())
        .bind(applied_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(resume_id) = job.resume_id {
            sqlx::query("INSERT INTO job_resume_used (job_id, resume_id) VALUES ($1, $2)")
                .bind(id)
                .bind(resume_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.get_job(user_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_job(
        &self,
        user_id: &str,
        job: &JobApplication,
        replace_resume: bool,
    ) -> StoreResult<Option<JobApplication>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE job_applications
               SET company = $3, role = $4, location = $5, job_url = $6, description = $7,
                   notes = $8, status = $9, resume_file_key = $10, cover_letter_file_key = $11,
                   applied_at = $12, updated_at = $13
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(job.id)
        .bind(user_id)
        .bind(&job.company)
        .bind(&job.role)
        .bind(&job.location)
        .bind(&job.job_url)
        .bind(&job.description)
        .bind(&job.notes)
        .bind(job.status.as_str())
        .bind(&job.resume_file_key)
        .bind(&job.cover_letter_file_key)
        .bind(job.applied_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if replace_resume {
            sqlx::query("DELETE FROM job_resume_used WHERE job_id = $1")
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
            if let Some(resume_id) = job.resume_id {
                sqlx::query("INSERT INTO job_resume_used (job_id, resume_id) VALUES ($1, $2)")
                    .bind(job.id)
                    .bind(resume_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;

        self.get_job(user_id, job.id).await
    }

    async fn delete_job(&self, user_id: &str, job_id: Uuid) -> StoreResult<Option<JobApplication>> {
        let Some(job) = self.get_job(user_id, job_id).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;
        for table in ["job_chat_messages", "job_suggestions", "job_resume_used"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE job_id = $1"))
                .bind(job_id)
                .execute(&mut *tx)
                .await?;
        }
        let deleted = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND user_id = $2")
            .bind(job_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted == 0 {
            return Ok(None);
        }
        info!("Deleted job {job_id} for user {user_id}");
        Ok(Some(job))
    }

    async fn list_chat_messages(
        &self,
        user_id: &str,
        job_id: Uuid,
    ) -> StoreResult<Vec<ChatMessage>> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT m.*
            FROM job_chat_messages m
            JOIN job_applications j ON j.id = m.job_id
            WHERE m.job_id = $1 AND j.user_id = $2
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_chat_message(
        &self,
        user_id: &str,
        job_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> StoreResult<Option<ChatMessage>> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO job_chat_messages (id, job_id, role, content, created_at)
            SELECT $1, j.id, $3, $4, $5
            FROM job_applications j
            WHERE j.id = $2 AND j.user_id = $6
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(role.as_str())
        .bind(content)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_suggestions(&self, user_id: &str, job_id: Uuid) -> StoreResult<Vec<Suggestion>> {
        sqlx::query_as::<_, Suggestion>(
            r#"
            SELECT s.*
            FROM job_suggestions s
            JOIN job_applications j ON j.id = s.job_id
            WHERE s.job_id = $1 AND j.user_id = $2
            ORDER BY s.created_at ASC, s.id
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn replace_suggestions(
        &self,
        user_id: &str,
        job_id: Uuid,
        resume_id: Option<Uuid>,
        suggestions: &[NewSuggestion],
    ) -> StoreResult<Option<Vec<Suggestion>>> {
        let mut tx = self.pool.begin().await?;
        let owned: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM job_applications WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(job_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM job_suggestions WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let mut stored = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let row = sqlx::query_as::<_, Suggestion>(
                r#"
                INSERT INTO job_suggestions (id, job_id, resume_id, category, content, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(resume_id)
            .bind(&suggestion.category)
            .bind(&suggestion.content)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }
        tx.commit().await?;

        Ok(Some(stored))
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn list_resumes(&self, user_id: &str) -> StoreResult<Vec<Resume>> {
        sqlx::query_as::<_, Resume>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>> {
        sqlx::query_as::<_, Resume>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_resume(&self, user_id: &str, resume: NewResume) -> StoreResult<Resume> {
        sqlx::query_as::<_, Resume>(
            r#"
            INSERT INTO resumes (id, user_id, name, file_key, content_type, size_bytes, text_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&resume.name)
        .bind(&resume.file_key)
        .bind(&resume.content_type)
        .bind(resume.size_bytes)
        .bind(&resume.text_content)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_resume(&self, user_id: &str, resume_id: Uuid) -> StoreResult<Option<Resume>> {
        sqlx::query_as::<_, Resume>(
            "DELETE FROM resumes WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, user_id: &str) -> StoreResult<Vec<Contact>> {
        sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<Option<Contact>> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(contact_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_contact(
        &self,
        user_id: &str,
        contact: CreateContactRequest,
    ) -> StoreResult<Contact> {
        let now = Utc::now();
        sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts
                (id, user_id, name, company, role, link, email, notes, status,
                 last_contacted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&contact.name)
        .bind(&contact.company)
        .bind(&contact.role)
        .bind(&contact.link)
        .bind(&contact.email)
        .bind(&contact.notes)
        .bind(contact.status.as_str())
        .bind(contact.last_contacted_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_contact(
        &self,
        user_id: &str,
        contact: &Contact,
    ) -> StoreResult<Option<Contact>> {
        sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
               SET name = $3, company = $4, role = $5, link = $6, email = $7, notes = $8,
                   status = $9, last_contacted_at = $10, updated_at = $11
             WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(contact.id)
        .bind(user_id)
        .bind(&contact.name)
        .bind(&contact.company)
        .bind(&contact.role)
        .bind(&contact.link)
        .bind(&contact.email)
        .bind(&contact.notes)
        .bind(contact.status.as_str())
        .bind(contact.last_contacted_at)
        .bind(contact.updated_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_contact(&self, user_id: &str, contact_id: Uuid) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(contact_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        contact_id: Uuid,
    ) -> StoreResult<Vec<ContactInteraction>> {
        sqlx::query_as::<_, ContactInteraction>(
            r#"
            SELECT i.*
            FROM contact_interactions i
            JOIN contacts c ON c.id = i.contact_id
            WHERE i.contact_id = $1 AND c.user_id = $2
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(contact_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction: CreateInteractionRequest,
    ) -> StoreResult<Option<ContactInteraction>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, ContactInteraction>(
            r#"
            INSERT INTO contact_interactions (id, contact_id, interaction_type, notes, created_at)
            SELECT $1, c.id, $3, $4, $5
            FROM contacts c
            WHERE c.id = $2 AND c.user_id = $6
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(contact_id)
        .bind(interaction.interaction_type.as_str())
        .bind(&interaction.notes)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(created) = created else {
            tx.rollback().await?;
            return Ok(None);
        };

        if created.interaction_type.touches_contact() {
            sqlx::query(
                "UPDATE contacts SET last_contacted_at = $1, updated_at = $1 WHERE id = $2 AND user_id = $3",
            )
            .bind(created.created_at)
            .bind(contact_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Some(created))
    }

    async fn delete_interaction(
        &self,
        user_id: &str,
        contact_id: Uuid,
        interaction_id: Uuid,
    ) -> StoreResult<bool> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM contact_interactions i
            USING contacts c
            WHERE i.id = $1 AND i.contact_id = $2 AND c.id = i.contact_id AND c.user_id = $3
            "#,
        )
        .bind(interaction_id)
        .bind(contact_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted > 0)
    }

    async fn list_reminders(
        &self,
        user_id: &str,
        contact_id: Uuid,
    ) -> StoreResult<Vec<ContactReminder>> {
        sqlx::query_as::<_, ContactReminder>(
            r#"
            SELECT r.*
            FROM contact_reminders r
            JOIN contacts c ON c.id = r.contact_id
            WHERE r.contact_id = $1 AND c.user_id = $2
            ORDER BY r.due_date ASC
            "#,
        )
        .bind(contact_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_user_reminders(
        &self,
        user_id: &str,
        include_completed: bool,
    ) -> StoreResult<Vec<ContactReminder>> {
        sqlx::query_as::<_, ContactReminder>(
            r#"
            SELECT r.*
            FROM contact_reminders r
            JOIN contacts c ON c.id = r.contact_id
            WHERE c.user_id = $1 AND ($2 OR NOT r.completed)
            ORDER BY r.due_date ASC
            "#,
        )
        .bind(user_id)
        .bind(include_completed)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<Option<ContactReminder>> {
        sqlx::query_as::<_, ContactReminder>(
            r#"
            SELECT r.*
            FROM contact_reminders r
            JOIN contacts c ON c.id = r.contact_id
            WHERE r.id = $1 AND r.contact_id = $2 AND c.user_id = $3
            "#,
        )
        .bind(reminder_id)
        .bind(contact_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder: CreateReminderRequest,
    ) -> StoreResult<Option<ContactReminder>> {
        let now = Utc::now();
        sqlx::query_as::<_, ContactReminder>(
            r#"
            INSERT INTO contact_reminders
                (id, contact_id, title, description, due_date, completed, created_at, updated_at)
            SELECT $1, c.id, $3, $4, $5, FALSE, $6, $6
            FROM contacts c
            WHERE c.id = $2 AND c.user_id = $7
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(contact_id)
        .bind(reminder.title.trim())
        .bind(crate::validation::normalize(reminder.description))
        .bind(reminder.due_date)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_reminder(
        &self,
        user_id: &str,
        reminder: &ContactReminder,
    ) -> StoreResult<Option<ContactReminder>> {
        sqlx::query_as::<_, ContactReminder>(
            r#"
            UPDATE contact_reminders r
               SET title = $4, description = $5, due_date = $6, completed = $7, updated_at = $8
              FROM contacts c
             WHERE r.id = $1 AND r.contact_id = $2 AND c.id = r.contact_id AND c.user_id = $3
            RETURNING r.*
            "#,
        )
        .bind(reminder.id)
        .bind(reminder.contact_id)
        .bind(user_id)
        .bind(&reminder.title)
        .bind(&reminder.description)
        .bind(reminder.due_date)
        .bind(reminder.completed)
        .bind(reminder.updated_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_reminder(
        &self,
        user_id: &str,
        contact_id: Uuid,
        reminder_id: Uuid,
    ) -> StoreResult<bool> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM contact_reminders r
            USING contacts c
            WHERE r.id = $1 AND r.contact_id = $2 AND c.id = r.contact_id AND c.user_id = $3
            "#,
        )
        .bind(reminder_id)
        .bind(contact_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted > 0)
    }
}
