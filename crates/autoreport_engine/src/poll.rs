use std::time::Duration;

use autoreport_core::AnalysisResult;
use report_logging::{report_debug, report_info, report_warn, short_job_id};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::wire::ResultPayload;
use crate::{Transport, TransportError};

/// Fixed-interval polling: no backoff, no jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Total requests allowed, `None` for unlimited.
    pub max_attempts: Option<u32>,
    /// Wall-clock budget for the whole loop, `None` for unlimited.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: None,
            timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// A poll request failed. The loop stops instead of treating it as pending.
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("polling cancelled")]
    Cancelled,
    #[error("no result after {attempts} polls")]
    TimedOut { attempts: u32 },
}

/// Observer for non-terminal poll responses.
pub trait PollSink: Send + Sync {
    fn pending(&self, attempt: u32, server_state: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPollSink;

impl PollSink for NoopPollSink {
    fn pending(&self, _attempt: u32, _server_state: &str) {}
}

/// Polls `fetch_result` until the server reports `done`.
///
/// Requests never overlap: each one completes before the delay starts. The loop
/// returns on the first `done` response, the first failed request, cancellation,
/// or when the policy's attempt cap or time budget is exhausted.
pub async fn poll_until_done(
    transport: &dyn Transport,
    job_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    sink: &dyn PollSink,
) -> Result<AnalysisResult, PollError> {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            payload = transport.fetch_result(job_id) => payload,
        };

        let state = match payload {
            Ok(ResultPayload::Done(result)) => {
                report_info!(
                    "Job {} done after {} polls",
                    short_job_id(job_id),
                    attempt
                );
                return Ok(result);
            }
            Ok(ResultPayload::InProgress { state }) => state,
            Err(err) => {
                report_warn!(
                    "Poll {} for job {} failed: {}",
                    attempt,
                    short_job_id(job_id),
                    err
                );
                return Err(err.into());
            }
        };

        report_debug!(
            "Poll {} for job {}: state={}",
            attempt,
            short_job_id(job_id),
            state
        );
        sink.pending(attempt, &state);

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(PollError::TimedOut { attempts: attempt });
        }
        if let Some(timeout) = policy.timeout {
            if started.elapsed() + policy.interval > timeout {
                return Err(PollError::TimedOut { attempts: attempt });
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}
