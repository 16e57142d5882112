pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::auth::handlers as auth;
use crate::contacts::{handlers as contacts, interactions, reminders};
use crate::jobs::{files as job_files, handlers as jobs};
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/login", get(auth::handle_login))
        .route("/api/auth/callback", get(auth::handle_callback))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route("/api/auth/me", get(auth::handle_me))
        // Jobs
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/api/jobs/:id/files/:kind",
            post(job_files::handle_upload_job_file)
                .get(job_files::handle_download_job_file)
                .delete(job_files::handle_delete_job_file),
        )
        .route("/api/jobs/:id/analyze", post(assistant::handle_analyze))
        .route(
            "/api/jobs/:id/suggestions",
            get(assistant::handle_list_suggestions),
        )
        .route(
            "/api/jobs/:id/chat",
            get(assistant::handle_list_chat).post(assistant::handle_chat),
        )
        // Resumes
        .route(
            "/api/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_upload_resume),
        )
        .route(
            "/api/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        .route(
            "/api/resumes/:id/download",
            get(resumes::handle_download_resume),
        )
        // Contacts
        .route(
            "/api/contacts",
            get(contacts::handle_list_contacts).post(contacts::handle_create_contact),
        )
        .route(
            "/api/contacts/:id",
            get(contacts::handle_get_contact)
                .patch(contacts::handle_update_contact)
                .delete(contacts::handle_delete_contact),
        )
        .route(
            "/api/contacts/:id/interactions",
            get(interactions::handle_list_interactions)
                .post(interactions::handle_create_interaction),
        )
        .route(
            "/api/contacts/:id/interactions/:interaction_id",
            axum::routing::delete(interactions::handle_delete_interaction),
        )
        .route(
            "/api/contacts/:id/reminders",
            get(reminders::handle_list_reminders).post(reminders::handle_create_reminder),
        )
        .route(
            "/api/contacts/:id/reminders/:reminder_id",
            patch(reminders::handle_update_reminder).delete(reminders::handle_delete_reminder),
        )
        .route("/api/reminders", get(reminders::handle_list_all_reminders))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
