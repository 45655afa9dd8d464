use std::sync::Arc;

use crate::workflow::WorkflowController;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the single session; every workflow action goes through it.
    pub workflow: Arc<WorkflowController>,
    /// Body limit of the resume upload route.
    pub max_upload_bytes: usize,
}
