use std::sync::Arc;

use crate::assistant::ResumeAssistant;
use crate::auth::provider::IdentityProvider;
use crate::config::Config;
use crate::storage::FileStorage;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
/// Each external collaborator sits behind a trait object so tests can swap it.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: Arc<dyn FileStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub assistant: Arc<dyn ResumeAssistant>,
    pub config: Config,
}
