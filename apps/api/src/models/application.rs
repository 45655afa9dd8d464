use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::Job;
use crate::models::null_as_default;

/// Question → answer entered by the user.
pub type Answers = BTreeMap<String, String>;

/// Tailored application materials for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPackage {
    /// Always overwritten with the id of the job the package was drafted for.
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_id: String,
    pub cover_letter: String,
    pub resume_tailoring_tips: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_answers: BTreeMap<String, String>,
    /// Mandatory questions. Submission is blocked until each has a non-empty answer.
    pub required_additional_info: Vec<String>,
}

impl ApplicationPackage {
    /// Required questions with no non-blank answer, in declaration order.
    pub fn unanswered<'a>(&'a self, answers: &Answers) -> Vec<&'a str> {
        self.required_additional_info
            .iter()
            .filter(|q| answers.get(*q).map_or(true, |a| a.trim().is_empty()))
            .map(String::as_str)
            .collect()
    }
}

/// An application exited before submission; replaced, never accumulated, per job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftJob {
    pub job: Job,
    pub application: ApplicationPackage,
    pub saved_at: DateTime<Utc>,
    pub partial_answers: Answers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Synced,
    Pending,
    #[serde(rename = "Recruiter Viewed")]
    RecruiterViewed,
    #[serde(rename = "Action Required")]
    ActionRequired,
}

/// A submitted application. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedJob {
    pub job: Job,
    pub application: ApplicationPackage,
    pub submitted_at: DateTime<Utc>,
    pub answers: Answers,
    pub sync_status: SyncStatus,
    pub platform_ref_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(questions: &[&str]) -> ApplicationPackage {
        ApplicationPackage {
            job_id: "j1".into(),
            cover_letter: "Dear team".into(),
            resume_tailoring_tips: vec![],
            suggested_answers: BTreeMap::new(),
            required_additional_info: questions.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn test_unanswered_lists_missing_and_blank_answers() {
        let pkg = package(&["Notice period?", "Willing to relocate?", "Current CTC?"]);
        let mut answers = Answers::new();
        answers.insert("Notice period?".into(), "30 days".into());
        answers.insert("Willing to relocate?".into(), "   ".into());
        assert_eq!(
            pkg.unanswered(&answers),
            vec!["Willing to relocate?", "Current CTC?"]
        );
    }

    #[test]
    fn test_no_required_questions_means_nothing_unanswered() {
        assert!(package(&[]).unanswered(&Answers::new()).is_empty());
    }

    #[test]
    fn test_package_requires_mandatory_fields() {
        let json = r#"{"cover_letter": "Hi", "resume_tailoring_tips": []}"#;
        let result: Result<ApplicationPackage, _> = serde_json::from_str(json);
        assert!(result.is_err(), "required_additional_info is mandatory");
    }

    #[test]
    fn test_sync_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::RecruiterViewed).unwrap(),
            "\"Recruiter Viewed\""
        );
        let status: SyncStatus = serde_json::from_str("\"Action Required\"").unwrap();
        assert_eq!(status, SyncStatus::ActionRequired);
    }
}
