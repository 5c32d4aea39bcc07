use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::GenerativeModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The generative backend, constructed once at startup. `None` when the
    /// API credential is missing — analysis requests then return 503.
    pub model: Option<Arc<dyn GenerativeModel>>,
    pub config: Config,
}
