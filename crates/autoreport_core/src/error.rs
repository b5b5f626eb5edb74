use crate::{InFlight, JobId};

/// A user intent that is not valid for the job's current state.
///
/// Rejected intents never change the job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no study file selected")]
    NoFileSelected,
    #[error("study already uploaded as job {0}")]
    AlreadyUploaded(JobId),
    #[error("analysis requires an uploaded study")]
    NotUploaded,
    #[error("analysis already started for job {0}")]
    AlreadyAnalyzed(JobId),
    #[error("polling can only resume while the job is analyzing")]
    NotAnalyzing,
    #[error("{0} is still in flight")]
    OperationInFlight(InFlight),
}
