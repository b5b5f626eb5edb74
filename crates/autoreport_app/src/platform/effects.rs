use std::path::PathBuf;
use std::time::Duration;

use autoreport_core::{Effect, JobTicket, Msg, PollOutcome};
use autoreport_engine::{EngineConfig, EngineError, EngineEvent, EngineHandle, PollError, TransportError};
use report_logging::{report_debug, report_info, report_warn};

/// What the driver loop receives from the engine.
#[derive(Debug)]
pub enum Inbound {
    Core(Msg),
    Artifacts {
        ticket: JobTicket,
        result: Result<Vec<PathBuf>, TransportError>,
    },
}

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            engine: EngineHandle::new(config)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload { ticket, file } => {
                    report_info!("Upload {} file={}", ticket, file.file_name);
                    self.engine.upload(ticket, file);
                }
                Effect::TriggerAnalysis { ticket, job_id } => {
                    report_info!("TriggerAnalysis {} job_id={}", ticket, job_id);
                    self.engine.trigger_analysis(ticket, job_id);
                }
                Effect::StartPolling { ticket, job_id } => {
                    report_info!("StartPolling {} job_id={}", ticket, job_id);
                    self.engine.start_polling(ticket, job_id);
                }
                Effect::Cancel { ticket } => self.engine.cancel(ticket),
            }
        }
    }

    pub fn download_artifacts(&self, ticket: JobTicket, hrefs: Vec<String>, output_dir: PathBuf) {
        report_info!("Downloading {} artifacts for {}", hrefs.len(), ticket);
        self.engine.download_artifacts(ticket, hrefs, output_dir);
    }

    /// `Ok(None)` when nothing arrived within `timeout`.
    pub fn next(&self, timeout: Duration) -> Result<Option<Inbound>, EngineError> {
        Ok(self.engine.recv_timeout(timeout)?.map(map_event))
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Inbound {
    report_debug!("Engine event for {}", event.ticket());
    match event {
        EngineEvent::Uploaded { ticket, result } => Inbound::Core(Msg::UploadFinished {
            ticket,
            result: result.map_err(|err| {
                report_warn!("Upload {} failed: {}", ticket, err);
                err.to_string()
            }),
        }),
        EngineEvent::AnalysisTriggered { ticket, result } => {
            Inbound::Core(Msg::AnalysisTriggered {
                ticket,
                result: result.map_err(|err| {
                    report_warn!("Analysis trigger {} failed: {}", ticket, err);
                    err.to_string()
                }),
            })
        }
        EngineEvent::PollProgress {
            ticket,
            attempt,
            server_state,
        } => Inbound::Core(Msg::PollProgress {
            ticket,
            attempt,
            server_state,
        }),
        EngineEvent::PollFinished { ticket, result } => Inbound::Core(Msg::PollFinished {
            ticket,
            outcome: poll_outcome(result),
        }),
        EngineEvent::ArtifactsSaved { ticket, result } => Inbound::Artifacts { ticket, result },
    }
}

fn poll_outcome(result: Result<autoreport_core::AnalysisResult, PollError>) -> PollOutcome {
    match result {
        Ok(analysis) => PollOutcome::Done(analysis),
        Err(PollError::Transport(err)) if err.is_not_found() => PollOutcome::NotFound,
        Err(PollError::Transport(err)) => {
            report_warn!("Polling stopped: {}", err);
            PollOutcome::Transport(err.to_string())
        }
        Err(PollError::TimedOut { attempts }) => PollOutcome::TimedOut { attempts },
        Err(PollError::Cancelled) => PollOutcome::Cancelled,
    }
}
