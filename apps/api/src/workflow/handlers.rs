use std::time::Duration;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Answers, AppliedJob, ApplicationPackage, DraftJob, Job, Profile};
use crate::profile::ingest::ResumeDocument;
use crate::state::AppState;
use crate::workflow::state::{SessionSnapshot, WorkflowStatus};

/// Shown in turn while a job search runs, unless the caller pinned a label.
pub const SEARCH_PROGRESS_MESSAGES: [&str; 8] = [
    "Scanning LinkedIn India...",
    "Scraping Naukri & Indeed portals...",
    "Identifying relevant leads...",
    "Converting salary ranges to INR...",
    "Matching skills with job descriptions...",
    "Ranking by match percentage...",
    "Filtering expired listings...",
    "Finalizing your job feed...",
];
const PROGRESS_ROTATION: Duration = Duration::from_millis(3500);

pub fn search_progress_label(elapsed: Duration) -> &'static str {
    let step = (elapsed.as_millis() / PROGRESS_ROTATION.as_millis()) as usize;
    SEARCH_PROGRESS_MESSAGES[step % SEARCH_PROGRESS_MESSAGES.len()]
}

#[derive(Debug, Default, Deserialize)]
pub struct AnswersRequest {
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub label: String,
}

#[derive(Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
}

#[derive(Serialize)]
pub struct ResumeDraftResponse {
    pub answers: Answers,
}

/// GET /api/v1/session
pub async fn handle_snapshot(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut snapshot = state.workflow.snapshot().await;
    if snapshot.status == WorkflowStatus::SearchingJobs && !snapshot.label_pinned {
        let elapsed = snapshot.elapsed.unwrap_or_default();
        snapshot.progress_label = Some(search_progress_label(elapsed).to_string());
    }
    Json(snapshot)
}

/// POST /api/v1/profile  (multipart, field `file`)
pub async fn handle_onboard(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Profile>, AppError> {
    let limit = state.max_upload_bytes;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| upload_error(e, limit))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| AppError::Validation("Please upload a resume in the `file` field.".into()))?;
    info!("Resume upload received: '{file_name}' ({} bytes)", bytes.len());

    // Unsupported files are rejected here, before the session is touched.
    let document = ResumeDocument::from_upload(&file_name, &bytes)?;
    let profile = state.workflow.onboard(document).await?;
    Ok(Json(profile))
}

/// The body limit surfaces as a multipart error; report it as such.
fn upload_error(error: MultipartError, limit: usize) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge { limit }
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", error.body_text()))
    }
}

/// POST /api/v1/jobs/search
pub async fn handle_search(State(state): State<AppState>) -> Result<Json<JobsResponse>, AppError> {
    let jobs = state.workflow.search().await?;
    Ok(Json(JobsResponse { jobs }))
}

/// POST /api/v1/applications/:job_id
pub async fn handle_start_application(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ApplicationPackage>, AppError> {
    let package = state.workflow.start_application(&job_id).await?;
    Ok(Json(package))
}

/// DELETE /api/v1/applications/current
pub async fn handle_dismiss_application(State(state): State<AppState>) -> StatusCode {
    state.workflow.dismiss_application().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/applications/current/draft
pub async fn handle_save_draft(
    State(state): State<AppState>,
    Json(req): Json<AnswersRequest>,
) -> Result<Json<DraftJob>, AppError> {
    let draft = state.workflow.save_draft(req.answers).await?;
    Ok(Json(draft))
}

/// POST /api/v1/applications/current/finalize
pub async fn handle_finalize(
    State(state): State<AppState>,
    Json(req): Json<AnswersRequest>,
) -> Result<Json<AppliedJob>, AppError> {
    let applied = state.workflow.finalize(req.answers).await?;
    Ok(Json(applied))
}

/// POST /api/v1/drafts/:job_id/resume
pub async fn handle_resume_draft(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ResumeDraftResponse>, AppError> {
    let answers = state.workflow.resume_draft(&job_id).await?;
    Ok(Json(ResumeDraftResponse { answers }))
}

/// DELETE /api/v1/drafts/:job_id
pub async fn handle_cancel_draft(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let job = state.workflow.cancel_draft(&job_id).await?;
    Ok(Json(job))
}

/// PUT /api/v1/session/progress
pub async fn handle_set_progress(
    State(state): State<AppState>,
    Json(req): Json<ProgressRequest>,
) -> Result<StatusCode, AppError> {
    state.workflow.set_progress_label(req.label).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/session/notice
pub async fn handle_dismiss_notice(State(state): State<AppState>) -> StatusCode {
    state.workflow.dismiss_notice().await;
    StatusCode::NO_CONTENT
}
