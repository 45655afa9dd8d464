//! Workflow controller — the single owner of the session.
//!
//! Each operation takes the lock to begin, releases it across the service
//! call, then takes it again to complete. Only the transition functions on
//! `Session` mutate state.
//!
//! The service call and its completing transition run in a spawned task. A
//! request that goes away mid-call drops only its wait, so the session still
//! settles.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use crate::application::drafter::draft_application;
use crate::discovery::{DiscoveryPipeline, DiscoverySettings};
use crate::errors::AppError;
use crate::extraction::StructuredClient;
use crate::models::{Answers, AppliedJob, ApplicationPackage, DraftJob, Job, Profile};
use crate::profile::analyzer::analyze_resume;
use crate::profile::ingest::ResumeDocument;
use crate::workflow::state::{Session, SessionSnapshot};
use crate::workflow::sync::PlatformSync;

pub struct WorkflowController {
    session: Arc<Mutex<Session>>,
    client: StructuredClient,
    discovery: DiscoveryPipeline,
    platform: Arc<dyn PlatformSync>,
}

impl WorkflowController {
    pub fn new(
        client: StructuredClient,
        settings: DiscoverySettings,
        platform: Arc<dyn PlatformSync>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            discovery: DiscoveryPipeline::new(client.clone(), settings),
            client,
            platform,
        }
    }

    pub async fn onboard(&self, document: ResumeDocument) -> Result<Profile, AppError> {
        self.session.lock().await.begin_onboard()?;
        let session = self.session.clone();
        let client = self.client.clone();
        run_detached("onboarding", async move {
            let result = analyze_resume(&client, &document).await;
            session.lock().await.complete_onboard(result)
        })
        .await
    }

    pub async fn search(&self) -> Result<Vec<Job>, AppError> {
        let profile = self.session.lock().await.begin_search()?;
        let session = self.session.clone();
        let discovery = self.discovery.clone();
        run_detached("job search", async move {
            let result = discovery.run(&profile).await;
            session.lock().await.complete_search(result)
        })
        .await
    }

    pub async fn start_application(&self, job_id: &str) -> Result<ApplicationPackage, AppError> {
        let (ticket, profile, job) = self.session.lock().await.begin_application(job_id)?;
        let session = self.session.clone();
        let client = self.client.clone();
        run_detached("application drafting", async move {
            let result = draft_application(&client, &profile, &job).await;
            session.lock().await.complete_application(ticket, result)
        })
        .await
    }

    pub async fn dismiss_application(&self) {
        self.session.lock().await.dismiss_application();
    }

    pub async fn save_draft(&self, answers: Answers) -> Result<DraftJob, AppError> {
        self.session.lock().await.save_draft(answers)
    }

    pub async fn resume_draft(&self, job_id: &str) -> Result<Answers, AppError> {
        self.session.lock().await.resume_draft(job_id)
    }

    pub async fn cancel_draft(&self, job_id: &str) -> Result<Job, AppError> {
        self.session.lock().await.cancel_draft(job_id)
    }

    pub async fn finalize(&self, answers: Answers) -> Result<AppliedJob, AppError> {
        let submission = self.session.lock().await.begin_finalize(answers)?;
        let session = self.session.clone();
        let platform = self.platform.clone();
        run_detached("submission", async move {
            let result = platform
                .submit(&submission.job, &submission.package, &submission.answers)
                .await;
            session.lock().await.complete_finalize(submission, result)
        })
        .await
    }

    pub async fn set_progress_label(&self, label: String) -> Result<(), AppError> {
        self.session.lock().await.set_progress_label(label)
    }

    pub async fn dismiss_notice(&self) {
        self.session.lock().await.dismiss_notice();
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }
}

/// Spawns `work` and waits for it. Dropping the returned future does not
/// cancel the task.
async fn run_detached<T, F>(operation: &str, work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("Workflow task for {operation} did not finish: {e}");
        AppError::Internal(anyhow::anyhow!("{operation} task failed: {e}"))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::testing::ScriptedService;
    use crate::llm_client::LlmError;
    use crate::models::SyncStatus;
    use crate::workflow::state::WorkflowStatus;
    use crate::workflow::sync::LocalPlatformSync;

    const PROFILE_JSON: &str = r#"{
        "name": "Asha Rao", "headline": "Backend Engineer", "summary": "Go engineer",
        "skills": ["Go", "Distributed Systems"], "experience": [],
        "total_years_experience": 6
    }"#;

    const JOBS_JSON: &str = r#"[
        {"id": "j1", "title": "Backend Engineer", "company": "Acme", "url": "https://linkedin.com/jobs/1",
         "salary": "25-35 LPA", "platform": "LinkedIn", "match_score": 0.92},
        {"id": "j2", "title": "Go Developer", "company": "Globex", "url": "https://naukri.com/2",
         "salary": "Not disclosed", "platform": "Naukri", "match_score": 60}
    ]"#;

    fn package_json(questions: &str) -> String {
        format!(
            r#"{{"cover_letter": "Dear Acme", "resume_tailoring_tips": ["Lead with Go"],
                 "required_additional_info": {questions}}}"#
        )
    }

    fn controller(service: ScriptedService) -> (WorkflowController, Arc<ScriptedService>) {
        let service = Arc::new(service);
        let client = StructuredClient::new(
            service.clone(),
            RetryPolicy::default(),
            Duration::from_secs(30),
        );
        let controller =
            WorkflowController::new(client, DiscoverySettings::default(), Arc::new(LocalPlatformSync));
        (controller, service)
    }

    fn resume() -> ResumeDocument {
        ResumeDocument::from_upload("asha.txt", b"Asha Rao. Go, Distributed Systems.").unwrap()
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }

    fn assert_disjoint(snap: &SessionSnapshot) {
        let mut seen = HashSet::new();
        for id in snap
            .active_jobs
            .iter()
            .map(|j| &j.id)
            .chain(snap.drafts.iter().map(|d| &d.job.id))
            .chain(snap.applied.iter().map(|a| &a.job.id))
        {
            assert!(seen.insert(id.clone()), "job {id} appears twice");
        }
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (wf, _) = controller(
            ScriptedService::new()
                .reply(PROFILE_JSON)
                .reply_with_sources("Acme and Globex are hiring...", &["https://linkedin.com/jobs/1"])
                .reply(JOBS_JSON)
                .reply(&package_json(r#"["Willing to relocate?"]"#)),
        );

        let profile = wf.onboard(resume()).await.unwrap();
        assert_eq!(profile.skills, vec!["Go", "Distributed Systems"]);
        assert_eq!(wf.snapshot().await.status, WorkflowStatus::Ready);

        let jobs = wf.search().await.unwrap();
        let scores: Vec<u8> = jobs.iter().map(|j| j.match_score).collect();
        assert_eq!(scores, vec![92, 60]);
        assert_eq!(wf.snapshot().await.sources.len(), 1);

        let package = wf.start_application("j1").await.unwrap();
        assert_eq!(package.job_id, "j1");
        assert_eq!(package.required_additional_info, vec!["Willing to relocate?"]);

        let err = wf.finalize(Answers::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let snap = wf.snapshot().await;
        assert!(snap.applied.is_empty());
        assert!(snap.application.is_some());

        let applied = wf
            .finalize(answers(&[("Willing to relocate?", "Yes")]))
            .await
            .unwrap();
        assert_eq!(applied.sync_status, SyncStatus::Synced);
        assert!(applied.platform_ref_id.starts_with("LIN-"));

        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Ready);
        assert!(snap.active_jobs.iter().all(|j| j.id != "j1"));
        assert!(snap.drafts.iter().all(|d| d.job.id != "j1"));
        assert_eq!(snap.applied.len(), 1);
        assert_disjoint(&snap);
    }

    #[tokio::test]
    async fn test_draft_round_trip() {
        let (wf, _) = controller(
            ScriptedService::new()
                .reply(PROFILE_JSON)
                .reply("notes")
                .reply(JOBS_JSON)
                .reply(&package_json(r#"["Q1"]"#)),
        );
        wf.onboard(resume()).await.unwrap();
        wf.search().await.unwrap();
        wf.start_application("j1").await.unwrap();

        let draft = wf.save_draft(answers(&[("Q1", "A")])).await.unwrap();
        assert_eq!(draft.job.id, "j1");
        assert_disjoint(&wf.snapshot().await);

        let restored = wf.resume_draft("j1").await.unwrap();
        assert_eq!(restored, answers(&[("Q1", "A")]));

        let applied = wf.finalize(answers(&[("Q1", "edited")])).await.unwrap();
        assert_eq!(applied.answers, answers(&[("Q1", "edited")]));
        let snap = wf.snapshot().await;
        assert!(snap.drafts.is_empty());
        assert_disjoint(&snap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_failure_leaves_empty_list_and_ready() {
        // Onboarding succeeds; every call after that is rate limited.
        let (wf, service) = controller(
            ScriptedService::always(|| LlmError::RateLimited("quota exhausted".into()))
                .reply(PROFILE_JSON),
        );
        wf.onboard(resume()).await.unwrap();

        let err = wf.search().await.unwrap_err();
        assert!(matches!(err, AppError::TransientService(_)));
        assert_eq!(service.calls(), 1 + 4);
        assert!(service.requests()[1..].iter().all(|r| r.web_search));

        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Ready);
        assert!(snap.active_jobs.is_empty());
        assert!(snap.notice.is_some());
        assert!(snap.progress_label.is_none());
    }

    #[tokio::test]
    async fn test_failed_drafting_returns_to_ready_without_selection() {
        let (wf, _) = controller(
            ScriptedService::new()
                .reply(PROFILE_JSON)
                .reply("notes")
                .reply(JOBS_JSON)
                .fail(LlmError::Api {
                    status: 400,
                    message: "bad request".into(),
                }),
        );
        wf.onboard(resume()).await.unwrap();
        wf.search().await.unwrap();

        let err = wf.start_application("j2").await.unwrap_err();
        assert!(matches!(err, AppError::Service(_)));
        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Ready);
        assert!(snap.application.is_none());
        assert_eq!(snap.active_jobs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_requests_still_settle_the_session() {
        let (wf, _) = controller(
            ScriptedService::new()
                .reply(PROFILE_JSON)
                .reply("Acme and Globex are hiring...")
                .reply(JOBS_JSON)
                .with_latency(Duration::from_secs(10)),
        );

        let abandoned = tokio::time::timeout(Duration::from_secs(1), wf.onboard(resume())).await;
        assert!(abandoned.is_err());
        assert_eq!(wf.snapshot().await.status, WorkflowStatus::LoadingProfile);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Ready);
        assert!(snap.progress_label.is_none());
        assert_eq!(snap.profile.map(|p| p.name).as_deref(), Some("Asha Rao"));

        let abandoned = tokio::time::timeout(Duration::from_secs(1), wf.search()).await;
        assert!(abandoned.is_err());
        assert_eq!(wf.snapshot().await.status, WorkflowStatus::SearchingJobs);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Ready);
        assert_eq!(snap.active_jobs.len(), 2);
        assert!(snap.notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out_with_retry_notice() {
        let (wf, service) = controller(
            ScriptedService::new()
                .reply(PROFILE_JSON)
                .with_latency(Duration::from_secs(45)),
        );

        let err = wf.onboard(resume()).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout));
        assert_eq!(service.calls(), 1);
        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Idle);
        assert_eq!(
            snap.notice.and_then(|n| n.action),
            Some(crate::workflow::notice::NoticeAction::Retry)
        );
    }

    #[tokio::test]
    async fn test_unauthorized_onboarding_asks_to_reconnect() {
        let (wf, _) = controller(ScriptedService::new().fail(LlmError::Unauthorized { status: 401 }));
        wf.onboard(resume()).await.unwrap_err();

        let snap = wf.snapshot().await;
        assert_eq!(snap.status, WorkflowStatus::Idle);
        assert_eq!(
            snap.notice.and_then(|n| n.action),
            Some(crate::workflow::notice::NoticeAction::ReconnectCredentials)
        );
    }
}
