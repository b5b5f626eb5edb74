//! Autoreport core: pure job lifecycle state machine and result presenter.
mod effect;
mod error;
mod msg;
mod present;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::ValidationError;
pub use msg::{Msg, PollOutcome};
pub use present::{present, render_text, DownloadLink, ResultView, DISCLAIMER};
pub use state::{AnalysisResult, Downloads, InFlight, Job, JobId, JobState, JobTicket, StudyFile};
pub use update::update;
pub use view_model::AppViewModel;
