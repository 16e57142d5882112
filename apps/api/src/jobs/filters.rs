use serde::Deserialize;

use crate::listing::{matches_any, search_term, sort_by_created, SortDirection};
use crate::models::job::{JobApplication, JobStatus};

/// `GET /api/jobs?status=applied&search=acme&sort=asc`
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortDirection,
}

/// Search covers company, role, location and notes.
pub fn filter_jobs(mut jobs: Vec<JobApplication>, query: &JobListQuery) -> Vec<JobApplication> {
    if let Some(status) = query.status {
        jobs.retain(|job| job.status == status);
    }
    if let Some(term) = search_term(query.search.as_deref()) {
        jobs.retain(|job| {
            matches_any(
                &term,
                [
                    Some(job.company.as_str()),
                    Some(job.role.as_str()),
                    job.location.as_deref(),
                    job.notes.as_deref(),
                ],
            )
        });
    }
    sort_by_created(&mut jobs, query.sort, |job| job.created_at);
    jobs
}
