//! Platform submission seam. The workflow waits on it while in
//! `SubmittingToPlatform`.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Answers, ApplicationPackage, Job, SyncStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReceipt {
    pub status: SyncStatus,
    pub platform_ref_id: String,
}

#[async_trait]
pub trait PlatformSync: Send + Sync {
    async fn submit(
        &self,
        job: &Job,
        package: &ApplicationPackage,
        answers: &Answers,
    ) -> Result<SyncReceipt, AppError>;
}

/// Records the submission locally and confirms it straight away.
pub struct LocalPlatformSync;

#[async_trait]
impl PlatformSync for LocalPlatformSync {
    async fn submit(
        &self,
        job: &Job,
        _package: &ApplicationPackage,
        answers: &Answers,
    ) -> Result<SyncReceipt, AppError> {
        let platform_ref_id = platform_ref_id(&job.platform);
        info!(
            "Submitted job {} to {} with {} answers (ref {platform_ref_id})",
            job.id,
            job.platform,
            answers.len()
        );
        Ok(SyncReceipt {
            status: SyncStatus::Synced,
            platform_ref_id,
        })
    }
}

/// `<first three platform letters>-<10 uppercase hex>`, e.g. `LIN-3F9A0C21B7`.
pub fn platform_ref_id(platform: &str) -> String {
    let prefix: String = platform
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    let prefix = if prefix.is_empty() { "JOB".to_string() } else { prefix };
    let token = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}-{}", &token[..10])
}
