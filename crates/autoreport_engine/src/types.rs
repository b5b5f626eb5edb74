use std::fmt;
use std::path::PathBuf;

use autoreport_core::{AnalysisResult, JobId, JobTicket};

use crate::poll::PollError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Uploaded {
        ticket: JobTicket,
        result: Result<JobId, TransportError>,
    },
    AnalysisTriggered {
        ticket: JobTicket,
        result: Result<(), TransportError>,
    },
    PollProgress {
        ticket: JobTicket,
        attempt: u32,
        server_state: String,
    },
    PollFinished {
        ticket: JobTicket,
        result: Result<AnalysisResult, PollError>,
    },
    ArtifactsSaved {
        ticket: JobTicket,
        result: Result<Vec<PathBuf>, TransportError>,
    },
}

impl EngineEvent {
    pub fn ticket(&self) -> JobTicket {
        match self {
            EngineEvent::Uploaded { ticket, .. }
            | EngineEvent::AnalysisTriggered { ticket, .. }
            | EngineEvent::PollProgress { ticket, .. }
            | EngineEvent::PollFinished { ticket, .. }
            | EngineEvent::ArtifactsSaved { ticket, .. } => *ticket,
        }
    }
}

/// Failure of a single remote call. There is no retry at this layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::JobNotFound
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    /// The response is missing or has malformed expected fields.
    Protocol,
    JobNotFound,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::JobNotFound => write!(f, "job not found"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
