use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use autoreport_core::{JobId, JobTicket, StudyFile};
use report_logging::{report_debug, report_info};
use tokio_util::sync::CancellationToken;

use crate::artifacts::ArtifactFetcher;
use crate::poll::{poll_until_done, PollSink};
use crate::{
    AnalysisOptions, EngineConfig, EngineEvent, FailureKind, HttpTransport, PollPolicy,
    StudyUpload, Transport, TransportError,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("engine worker has stopped")]
    Disconnected,
}

enum EngineCommand {
    Upload {
        ticket: JobTicket,
        file: StudyFile,
    },
    TriggerAnalysis {
        ticket: JobTicket,
        job_id: JobId,
    },
    StartPolling {
        ticket: JobTicket,
        job_id: JobId,
    },
    DownloadArtifacts {
        ticket: JobTicket,
        hrefs: Vec<String>,
        output_dir: PathBuf,
    },
    Cancel {
        ticket: JobTicket,
    },
}

impl EngineCommand {
    fn ticket(&self) -> JobTicket {
        match self {
            EngineCommand::Upload { ticket, .. }
            | EngineCommand::TriggerAnalysis { ticket, .. }
            | EngineCommand::StartPolling { ticket, .. }
            | EngineCommand::DownloadArtifacts { ticket, .. }
            | EngineCommand::Cancel { ticket } => *ticket,
        }
    }
}

struct TicketWork {
    token: CancellationToken,
    active: usize,
    epoch: u64,
}

/// Cancellation tokens for tickets with work still running. An entry lives
/// until its last command finishes or the ticket is cancelled.
#[derive(Default)]
struct TicketRegistry {
    inner: Mutex<(u64, HashMap<JobTicket, TicketWork>)>,
}

impl TicketRegistry {
    fn begin(&self, ticket: JobTicket) -> (CancellationToken, u64) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (next_epoch, works) = &mut *guard;
        let work = works.entry(ticket).or_insert_with(|| {
            *next_epoch += 1;
            TicketWork {
                token: CancellationToken::new(),
                active: 0,
                epoch: *next_epoch,
            }
        });
        work.active += 1;
        (work.token.clone(), work.epoch)
    }

    fn finish(&self, ticket: JobTicket, epoch: u64) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let works = &mut guard.1;
        // A cancelled ticket may have been reused; leave the newer entry alone.
        let Some(work) = works.get_mut(&ticket).filter(|work| work.epoch == epoch) else {
            return;
        };
        work.active -= 1;
        if work.active == 0 {
            works.remove(&ticket);
        }
    }

    fn cancel(&self, ticket: JobTicket) -> bool {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.1.remove(&ticket) {
            Some(work) => {
                work.token.cancel();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).1.len()
    }
}

struct EngineContext {
    transport: HttpTransport,
    artifacts: ArtifactFetcher,
    analysis: AnalysisOptions,
    poll: PollPolicy,
}

/// Runs remote operations on a background runtime and reports completions as
/// [`EngineEvent`]s. All work for a ticket can be abandoned with [`EngineHandle::cancel`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let transport = HttpTransport::new(&config.transport)?;
        let artifacts = ArtifactFetcher::new(&transport, config.max_artifact_bytes);
        let context = Arc::new(EngineContext {
            transport,
            artifacts,
            analysis: config.analysis,
            poll: config.poll,
        });
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let registry = Arc::new(TicketRegistry::default());
            while let Ok(command) = cmd_rx.recv() {
                if let EngineCommand::Cancel { ticket } = command {
                    if registry.cancel(ticket) {
                        report_info!("Cancelling engine work for ticket {}", ticket);
                    }
                    continue;
                }
                let ticket = command.ticket();
                let (token, epoch) = registry.begin(ticket);
                let registry = registry.clone();
                let context = context.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(&context, command, token, event_tx).await;
                    registry.finish(ticket, epoch);
                });
            }
            report_debug!("Engine command channel closed");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn upload(&self, ticket: JobTicket, file: StudyFile) {
        self.send(EngineCommand::Upload { ticket, file });
    }

    pub fn trigger_analysis(&self, ticket: JobTicket, job_id: impl Into<JobId>) {
        self.send(EngineCommand::TriggerAnalysis {
            ticket,
            job_id: job_id.into(),
        });
    }

    pub fn start_polling(&self, ticket: JobTicket, job_id: impl Into<JobId>) {
        self.send(EngineCommand::StartPolling {
            ticket,
            job_id: job_id.into(),
        });
    }

    pub fn download_artifacts(&self, ticket: JobTicket, hrefs: Vec<String>, output_dir: PathBuf) {
        self.send(EngineCommand::DownloadArtifacts {
            ticket,
            hrefs,
            output_dir,
        });
    }

    pub fn cancel(&self, ticket: JobTicket) {
        self.send(EngineCommand::Cancel { ticket });
    }

    /// `Ok(None)` when no event is pending.
    pub fn try_recv(&self) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(EngineError::Disconnected),
        }
    }

    /// `Ok(None)` when nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }

    fn send(&self, command: EngineCommand) {
        // The worker thread only exits once this handle is dropped.
        let _ = self.cmd_tx.send(command);
    }
}

struct ChannelPollSink {
    ticket: JobTicket,
    tx: mpsc::Sender<EngineEvent>,
}

impl PollSink for ChannelPollSink {
    fn pending(&self, attempt: u32, server_state: &str) {
        let _ = self.tx.send(EngineEvent::PollProgress {
            ticket: self.ticket,
            attempt,
            server_state: server_state.to_string(),
        });
    }
}

async fn handle_command(
    context: &EngineContext,
    command: EngineCommand,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Upload { ticket, file } => {
            let result = cancellable(&token, async {
                let upload = StudyUpload::read(&file).await?;
                context.transport.submit_study(&upload).await
            })
            .await;
            EngineEvent::Uploaded { ticket, result }
        }
        EngineCommand::TriggerAnalysis { ticket, job_id } => {
            let result = cancellable(
                &token,
                context.transport.trigger_analysis(&job_id, &context.analysis),
            )
            .await;
            EngineEvent::AnalysisTriggered { ticket, result }
        }
        EngineCommand::StartPolling { ticket, job_id } => {
            let sink = ChannelPollSink {
                ticket,
                tx: event_tx.clone(),
            };
            let result =
                poll_until_done(&context.transport, &job_id, &context.poll, &token, &sink).await;
            EngineEvent::PollFinished { ticket, result }
        }
        EngineCommand::DownloadArtifacts {
            ticket,
            hrefs,
            output_dir,
        } => {
            let result = cancellable(&token, context.artifacts.save_all(&hrefs, &output_dir)).await;
            EngineEvent::ArtifactsSaved { ticket, result }
        }
        EngineCommand::Cancel { .. } => return,
    };
    let _ = event_tx.send(event);
}

async fn cancellable<T>(
    token: &CancellationToken,
    work: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TransportError::new(FailureKind::Cancelled, "cancelled")),
        result = work => result,
    }
}
