use crate::{AnalysisResult, JobId, JobTicket, StudyFile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a study archive. Discards any current job.
    FileSelected(StudyFile),
    /// User asked to upload the selected study.
    UploadClicked,
    /// User asked to analyse the uploaded study.
    AnalyzeClicked,
    /// User asked to restart polling after a failed poll request.
    ResumePolling,
    /// User discarded the current job without picking a new file.
    ResetClicked,
    /// Engine finished the upload request.
    UploadFinished {
        ticket: JobTicket,
        result: Result<JobId, String>,
    },
    /// Engine finished the analysis trigger request.
    AnalysisTriggered {
        ticket: JobTicket,
        result: Result<(), String>,
    },
    /// A poll came back with a non-terminal server state.
    PollProgress {
        ticket: JobTicket,
        attempt: u32,
        server_state: String,
    },
    /// The poll loop stopped.
    PollFinished {
        ticket: JobTicket,
        outcome: PollOutcome,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}

/// Why a poll loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Done(AnalysisResult),
    /// A poll request failed; the job may still be running server-side.
    Transport(String),
    /// The server no longer knows the job.
    NotFound,
    TimedOut { attempts: u32 },
    Cancelled,
}
