//! Session state and its transition functions.
//!
//! Every mutation of the three job collections happens here, under the
//! controller's single lock. A job id lives in at most one of
//! {active, drafts, applied}; transitions move it, never copy it.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::discovery::DiscoveryOutcome;
use crate::errors::AppError;
use crate::llm_client::GroundingSource;
use crate::models::{Answers, AppliedJob, ApplicationPackage, DraftJob, Job, Profile};
use crate::workflow::notice::Notice;
use crate::workflow::sync::SyncReceipt;

const ONBOARD_LABEL: &str = "Extracting skills...";
const SEARCH_LABEL: &str = "Searching jobs...";
const DRAFTING_LABEL: &str = "Drafting your application...";
const SUBMIT_LABEL: &str = "Submitting to platform...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    LoadingProfile,
    SearchingJobs,
    Applying,
    SubmittingToPlatform,
    SavingDraft,
    Ready,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStatus::Idle => "idle",
            WorkflowStatus::LoadingProfile => "profile loading",
            WorkflowStatus::SearchingJobs => "job search",
            WorkflowStatus::Applying => "application drafting",
            WorkflowStatus::SubmittingToPlatform => "submission",
            WorkflowStatus::SavingDraft => "draft saving",
            WorkflowStatus::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// The application dialog currently open, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApplication {
    pub job: Job,
    /// `None` while drafting is still in flight.
    pub package: Option<ApplicationPackage>,
    pub answers: Answers,
}

/// Everything needed to submit the open application once the lock is released.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job: Job,
    pub package: ApplicationPackage,
    pub answers: Answers,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: WorkflowStatus,
    pub progress_label: Option<String>,
    pub profile: Option<Profile>,
    pub active_jobs: Vec<Job>,
    pub drafts: Vec<DraftJob>,
    pub applied: Vec<AppliedJob>,
    pub application: Option<OpenApplication>,
    pub notice: Option<Notice>,
    pub sources: Vec<GroundingSource>,
    /// Time since the in-flight operation started.
    #[serde(skip)]
    pub elapsed: Option<Duration>,
    /// True once a caller has set the label explicitly.
    #[serde(skip)]
    pub label_pinned: bool,
}

#[derive(Debug)]
pub struct Session {
    status: WorkflowStatus,
    progress_label: Option<String>,
    label_pinned: bool,
    started_at: Option<Instant>,
    /// Bumped whenever an operation begins or a drafting dialog is dismissed.
    /// Only drafting results are checked against it; no other operation can
    /// be superseded.
    ticket: u64,
    profile: Option<Profile>,
    active_jobs: Vec<Job>,
    drafts: Vec<DraftJob>,
    applied: Vec<AppliedJob>,
    open: Option<OpenApplication>,
    notice: Option<Notice>,
    sources: Vec<GroundingSource>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            status: WorkflowStatus::Idle,
            progress_label: None,
            label_pinned: false,
            started_at: None,
            ticket: 0,
            profile: None,
            active_jobs: Vec::new(),
            drafts: Vec::new(),
            applied: Vec::new(),
            open: None,
            notice: None,
            sources: Vec::new(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.status, WorkflowStatus::Idle | WorkflowStatus::Ready)
    }

    fn resting_status(&self) -> WorkflowStatus {
        if self.profile.is_some() {
            WorkflowStatus::Ready
        } else {
            WorkflowStatus::Idle
        }
    }

    fn ensure_not_busy(&self, action: &str) -> Result<(), AppError> {
        if self.is_busy() {
            return Err(AppError::WorkflowState(format!(
                "Cannot {action} while {} is in progress.",
                self.status
            )));
        }
        Ok(())
    }

    fn require_profile(&self, action: &str) -> Result<Profile, AppError> {
        self.profile.clone().ok_or_else(|| {
            AppError::WorkflowState(format!("Upload a resume before you {action}."))
        })
    }

    fn transition(&mut self, to: WorkflowStatus) {
        debug!("Workflow {} -> {}", self.status, to);
        self.status = to;
    }

    fn enter(&mut self, to: WorkflowStatus, label: &str) -> u64 {
        self.transition(to);
        self.progress_label = Some(label.to_string());
        self.label_pinned = false;
        self.started_at = Some(Instant::now());
        self.notice = None;
        self.ticket += 1;
        self.ticket
    }

    fn settle(&mut self) {
        let to = self.resting_status();
        self.transition(to);
        self.progress_label = None;
        self.label_pinned = false;
        self.started_at = None;
    }

    fn fail<T>(&mut self, err: AppError, notice: Notice) -> Result<T, AppError> {
        warn!("Workflow operation failed: {err}");
        self.notice = Some(notice);
        Err(err)
    }

    fn holds_job(&self, id: &str) -> bool {
        self.drafts.iter().any(|d| d.job.id == id) || self.applied.iter().any(|a| a.job.id == id)
    }

    // ── Onboarding ──────────────────────────────────────────────────────────

    pub fn begin_onboard(&mut self) -> Result<(), AppError> {
        self.ensure_not_busy("upload a resume")?;
        self.enter(WorkflowStatus::LoadingProfile, ONBOARD_LABEL);
        Ok(())
    }

    /// A failure keeps any profile from an earlier onboarding.
    pub fn complete_onboard(
        &mut self,
        result: Result<Profile, AppError>,
    ) -> Result<Profile, AppError> {
        match result {
            Ok(profile) => {
                self.profile = Some(profile.clone());
                self.settle();
                Ok(profile)
            }
            Err(e) => {
                self.settle();
                let notice = Notice::from_error(&e);
                self.fail(e, notice)
            }
        }
    }

    // ── Search ──────────────────────────────────────────────────────────────

    /// Clears the active jobs up front so a failed refresh never shows a stale list.
    pub fn begin_search(&mut self) -> Result<Profile, AppError> {
        self.ensure_not_busy("search for jobs")?;
        let profile = self.require_profile("search for jobs")?;
        self.active_jobs.clear();
        self.sources.clear();
        self.enter(WorkflowStatus::SearchingJobs, SEARCH_LABEL);
        Ok(profile)
    }

    pub fn complete_search(
        &mut self,
        result: Result<DiscoveryOutcome, AppError>,
    ) -> Result<Vec<Job>, AppError> {
        match result {
            Ok(outcome) => {
                let total = outcome.jobs.len();
                let jobs: Vec<Job> = outcome
                    .jobs
                    .into_iter()
                    .filter(|j| !self.holds_job(&j.id))
                    .collect();
                if jobs.len() < total {
                    debug!(
                        "Dropped {} search results already saved as drafts or applied",
                        total - jobs.len()
                    );
                }
                self.active_jobs = jobs;
                self.sources = outcome.sources;
                self.settle();
                info!("Active job list replaced with {} jobs", self.active_jobs.len());
                Ok(self.active_jobs.clone())
            }
            Err(e) => {
                self.settle();
                let notice = Notice::from_error(&e);
                self.fail(e, notice)
            }
        }
    }

    // ── Application drafting ────────────────────────────────────────────────

    pub fn begin_application(&mut self, job_id: &str) -> Result<(u64, Profile, Job), AppError> {
        self.ensure_not_busy("start an application")?;
        let profile = self.require_profile("apply")?;
        let job = self
            .active_jobs
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} is not in the active job list.")))?;

        self.open = Some(OpenApplication {
            job: job.clone(),
            package: None,
            answers: Answers::new(),
        });
        let ticket = self.enter(WorkflowStatus::Applying, DRAFTING_LABEL);
        Ok((ticket, profile, job))
    }

    /// Results for a dismissed application are discarded without touching state.
    pub fn complete_application(
        &mut self,
        ticket: u64,
        result: Result<ApplicationPackage, AppError>,
    ) -> Result<ApplicationPackage, AppError> {
        if ticket != self.ticket || self.status != WorkflowStatus::Applying {
            info!("Discarding drafting result for a dismissed application");
            return Err(AppError::WorkflowState(
                "The application was closed before drafting finished.".to_string(),
            ));
        }

        match result {
            Ok(package) => {
                if let Some(open) = self.open.as_mut() {
                    open.package = Some(package.clone());
                }
                self.settle();
                Ok(package)
            }
            Err(e) => {
                self.open = None;
                self.settle();
                let notice = Notice::from_error(&e);
                self.fail(e, notice)
            }
        }
    }

    /// Closes the application dialog. Allowed in any state; while drafting,
    /// the eventual result is ignored.
    pub fn dismiss_application(&mut self) {
        if self.status == WorkflowStatus::Applying {
            self.ticket += 1;
            self.settle();
        }
        if let Some(open) = self.open.take() {
            info!("Application for job {} dismissed", open.job.id);
        }
    }

    fn open_with_package(&self) -> Result<(&OpenApplication, &ApplicationPackage), AppError> {
        let open = self
            .open
            .as_ref()
            .ok_or_else(|| AppError::WorkflowState("No application is open.".to_string()))?;
        let package = open.package.as_ref().ok_or_else(|| {
            AppError::WorkflowState("The application has not been drafted yet.".to_string())
        })?;
        Ok((open, package))
    }

    // ── Drafts ──────────────────────────────────────────────────────────────

    /// Moves the open application's job into drafts, replacing any earlier draft.
    pub fn save_draft(&mut self, answers: Answers) -> Result<DraftJob, AppError> {
        self.ensure_not_busy("save a draft")?;
        let (open, package) = self.open_with_package()?;
        let draft = DraftJob {
            job: open.job.clone(),
            application: package.clone(),
            saved_at: Utc::now(),
            partial_answers: answers,
        };

        self.transition(WorkflowStatus::SavingDraft);
        let id = draft.job.id.clone();
        self.active_jobs.retain(|j| j.id != id);
        self.drafts.retain(|d| d.job.id != id);
        self.drafts.push(draft.clone());
        self.open = None;
        self.settle();

        info!(
            "Saved draft for job {id} with {} answers",
            draft.partial_answers.len()
        );
        Ok(draft)
    }

    /// Reopens a draft and returns its saved answers. The draft stays in the
    /// draft list until it is re-saved, cancelled or submitted.
    pub fn resume_draft(&mut self, job_id: &str) -> Result<Answers, AppError> {
        self.ensure_not_busy("resume a draft")?;
        let draft = self
            .drafts
            .iter()
            .find(|d| d.job.id == job_id)
            .ok_or_else(|| AppError::NotFound(format!("No draft for job {job_id}.")))?;

        let answers = draft.partial_answers.clone();
        self.open = Some(OpenApplication {
            job: draft.job.clone(),
            package: Some(draft.application.clone()),
            answers: answers.clone(),
        });
        Ok(answers)
    }

    /// Deletes a draft and returns its job to the active list.
    pub fn cancel_draft(&mut self, job_id: &str) -> Result<Job, AppError> {
        self.ensure_not_busy("cancel a draft")?;
        let pos = self
            .drafts
            .iter()
            .position(|d| d.job.id == job_id)
            .ok_or_else(|| AppError::NotFound(format!("No draft for job {job_id}.")))?;

        let draft = self.drafts.remove(pos);
        if self.open.as_ref().is_some_and(|o| o.job.id == job_id) {
            self.open = None;
        }
        self.active_jobs.push(draft.job.clone());
        info!("Draft for job {job_id} cancelled");
        Ok(draft.job)
    }

    // ── Finalization ────────────────────────────────────────────────────────

    /// Validation gate: rejected without any state change while a required
    /// question has no non-blank answer.
    pub fn begin_finalize(&mut self, answers: Answers) -> Result<Submission, AppError> {
        self.ensure_not_busy("submit an application")?;
        let (open, package) = self.open_with_package()?;

        let unanswered = package.unanswered(&answers);
        if !unanswered.is_empty() {
            return Err(AppError::Validation(format!(
                "Please answer the required questions: {}",
                unanswered.join("; ")
            )));
        }

        let job = open.job.clone();
        let package = package.clone();
        if let Some(open) = self.open.as_mut() {
            open.answers = answers.clone();
        }
        self.enter(WorkflowStatus::SubmittingToPlatform, SUBMIT_LABEL);
        Ok(Submission {
            job,
            package,
            answers,
        })
    }

    /// On failure the application stays open so the user can retry.
    pub fn complete_finalize(
        &mut self,
        submission: Submission,
        result: Result<SyncReceipt, AppError>,
    ) -> Result<AppliedJob, AppError> {
        match result {
            Ok(receipt) => {
                let id = submission.job.id.clone();
                self.active_jobs.retain(|j| j.id != id);
                self.drafts.retain(|d| d.job.id != id);
                let applied = AppliedJob {
                    job: submission.job,
                    application: submission.package,
                    submitted_at: Utc::now(),
                    answers: submission.answers,
                    sync_status: receipt.status,
                    platform_ref_id: receipt.platform_ref_id,
                };
                self.applied.push(applied.clone());
                if self.open.as_ref().is_some_and(|o| o.job.id == id) {
                    self.open = None;
                }
                self.settle();
                info!(
                    "Application for job {id} submitted (ref {})",
                    applied.platform_ref_id
                );
                Ok(applied)
            }
            Err(e) => {
                self.settle();
                let notice = Notice::retry(&e);
                self.fail(e, notice)
            }
        }
    }

    // ── Presentation ────────────────────────────────────────────────────────

    pub fn set_progress_label(&mut self, label: String) -> Result<(), AppError> {
        if !self.is_busy() {
            return Err(AppError::WorkflowState(
                "No operation is in progress.".to_string(),
            ));
        }
        self.progress_label = Some(label);
        self.label_pinned = true;
        Ok(())
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            progress_label: self.progress_label.clone(),
            profile: self.profile.clone(),
            active_jobs: self.active_jobs.clone(),
            drafts: self.drafts.clone(),
            applied: self.applied.clone(),
            application: self.open.clone(),
            notice: self.notice.clone(),
            sources: self.sources.clone(),
            elapsed: self.started_at.map(|t| t.elapsed()),
            label_pinned: self.label_pinned,
        }
    }
}
