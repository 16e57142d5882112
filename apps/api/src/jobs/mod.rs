//! Job applications: CRUD, list filters and attached files. The AI routes under
//! `/api/jobs/:id` live in `crate::assistant::handlers`.

pub mod files;
pub mod filters;
pub mod handlers;
