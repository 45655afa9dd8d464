pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;
use crate::workflow::handlers;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/session", get(handlers::handle_snapshot))
        .route("/api/v1/session/progress", put(handlers::handle_set_progress))
        .route("/api/v1/session/notice", delete(handlers::handle_dismiss_notice))
        // Onboarding and search
        .route(
            "/api/v1/profile",
            post(handlers::handle_onboard).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/jobs/search", post(handlers::handle_search))
        // Applications
        .route(
            "/api/v1/applications/current",
            delete(handlers::handle_dismiss_application),
        )
        .route(
            "/api/v1/applications/current/draft",
            post(handlers::handle_save_draft),
        )
        .route(
            "/api/v1/applications/current/finalize",
            post(handlers::handle_finalize),
        )
        .route(
            "/api/v1/applications/:job_id",
            post(handlers::handle_start_application),
        )
        // Drafts
        .route("/api/v1/drafts/:job_id", delete(handlers::handle_cancel_draft))
        .route(
            "/api/v1/drafts/:job_id/resume",
            post(handlers::handle_resume_draft),
        )
        .with_state(state)
}
