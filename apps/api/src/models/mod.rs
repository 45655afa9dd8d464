use serde::{Deserialize, Deserializer};

pub mod application;
pub mod job;
pub mod profile;

pub use application::{Answers, AppliedJob, ApplicationPackage, DraftJob, SyncStatus};
pub use job::Job;
pub use profile::{Experience, Profile};

/// Treats an explicit `null` from the service like an absent optional field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
