use crate::{JobId, JobTicket, StudyFile};

/// Work the engine must perform on behalf of the state machine.
///
/// Every effect carries the ticket of the job generation that requested it;
/// completions are reported back with the same ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the study archive to the analysis service.
    Upload { ticket: JobTicket, file: StudyFile },
    /// Ask the service to start analysing an uploaded study.
    TriggerAnalysis { ticket: JobTicket, job_id: JobId },
    /// Poll the service until the job reports `done`.
    StartPolling { ticket: JobTicket, job_id: JobId },
    /// Abandon whatever the engine is still doing for `ticket`.
    Cancel { ticket: JobTicket },
}
