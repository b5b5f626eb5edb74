use std::fmt;
use std::path::{Path, PathBuf};

use crate::present::present;
use crate::view_model::AppViewModel;

/// Opaque identifier assigned by the analysis service on upload.
pub type JobId = String;

/// Identifies one job generation. Bumped on every file selection or reset so
/// that late engine completions for a discarded job can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct JobTicket(pub u64);

impl fmt::Display for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Unsubmitted,
    Uploaded,
    Analyzing,
    Done,
    Failed,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Unsubmitted => "Unsubmitted",
            JobState::Uploaded => "Uploaded",
            JobState::Analyzing => "Analyzing",
            JobState::Done => "Done",
            JobState::Failed => "Failed",
        }
    }
}

/// The remote operation currently owning the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    Uploading,
    Triggering,
    Polling,
}

impl fmt::Display for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InFlight::Uploading => write!(f, "upload"),
            InFlight::Triggering => write!(f, "analysis trigger"),
            InFlight::Polling => write!(f, "result polling"),
        }
    }
}

/// A study archive chosen by the operator. The engine reads it at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl StudyFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "study.zip".to_string());
        Self { path, file_name }
    }
}

/// Artifact links attached to a finished analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloads {
    pub dicom_sr: String,
    /// Present only when a segmentation was produced.
    pub dicom_seg: Option<String>,
    pub json: String,
    pub thumbnails: Option<Vec<String>>,
}

/// A validated, finished analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub impression: String,
    pub normal: bool,
    /// Probability in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Display order matters.
    pub findings: Vec<String>,
    pub downloads: Downloads,
}

/// One study's lifecycle, owned by whoever drives [`crate::update`].
///
/// `id` is set exactly when `state` is not [`JobState::Unsubmitted`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Job {
    pub(crate) generation: u64,
    pub(crate) file: Option<StudyFile>,
    pub(crate) id: Option<JobId>,
    pub(crate) state: JobState,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) result: Option<AnalysisResult>,
    pub(crate) poll_attempts: u32,
    pub(crate) server_state: Option<String>,
    pub(crate) last_error: Option<String>,
    dirty: bool,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> JobTicket {
        JobTicket(self.generation)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn file(&self) -> Option<&StudyFile> {
        self.file.as_ref()
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            state: self.state,
            file_name: self.file.as_ref().map(|file| file.file_name.clone()),
            job_id: self.id.clone(),
            busy: self.in_flight,
            poll_attempts: self.poll_attempts,
            server_state: self.server_state.clone(),
            last_error: self.last_error.clone(),
            can_upload: self.in_flight.is_none()
                && self.file.is_some()
                && self.state == JobState::Unsubmitted,
            can_analyze: self.in_flight.is_none() && self.state == JobState::Uploaded,
            result: self.result.as_ref().map(present),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drops the current job and starts a new generation.
    pub(crate) fn restart(&mut self, file: Option<StudyFile>) {
        let generation = self.generation + 1;
        *self = Job {
            generation,
            file,
            ..Job::default()
        };
        self.mark_dirty();
    }
}
