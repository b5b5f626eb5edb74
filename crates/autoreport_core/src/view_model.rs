use crate::{InFlight, JobId, JobState, ResultView};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub state: JobState,
    pub file_name: Option<String>,
    pub job_id: Option<JobId>,
    pub busy: Option<InFlight>,
    pub poll_attempts: u32,
    /// Last status string reported by the server while polling.
    pub server_state: Option<String>,
    pub last_error: Option<String>,
    pub can_upload: bool,
    pub can_analyze: bool,
    pub result: Option<ResultView>,
    pub dirty: bool,
}

impl AppViewModel {
    /// One-line status for the operator.
    pub fn status_line(&self) -> String {
        let mut line = self.state.label().to_string();
        if let Some(id) = &self.job_id {
            line.push_str(&format!(" | job {id}"));
        }
        match self.busy {
            Some(InFlight::Polling) => {
                let server = self.server_state.as_deref().unwrap_or("waiting");
                line.push_str(&format!(" | polling ({server}, {} polls)", self.poll_attempts));
            }
            Some(op) => line.push_str(&format!(" | {op} in progress")),
            None => {}
        }
        if let Some(err) = &self.last_error {
            line.push_str(&format!(" | error: {err}"));
        }
        line
    }
}
