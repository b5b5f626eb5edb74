use crate::{Effect, InFlight, Job, JobState, Msg, PollOutcome, ValidationError};

/// Pure update function: applies a message to the job and returns any effects.
///
/// User intents that are not valid in the current state are rejected with a
/// [`ValidationError`] and the job is handed back untouched. Engine completions
/// never fail; completions for an older generation are ignored.
pub fn update(mut job: Job, msg: Msg) -> (Job, Result<Vec<Effect>, ValidationError>) {
    let outcome = apply(&mut job, msg);
    (job, outcome)
}

fn apply(job: &mut Job, msg: Msg) -> Result<Vec<Effect>, ValidationError> {
    let effects = match msg {
        Msg::FileSelected(file) => {
            let effects = cancel_in_flight(job);
            job.restart(Some(file));
            effects
        }
        Msg::ResetClicked => {
            let effects = cancel_in_flight(job);
            job.restart(None);
            effects
        }
        Msg::UploadClicked => {
            ensure_idle(job)?;
            let file = job.file.clone().ok_or(ValidationError::NoFileSelected)?;
            if let Some(id) = &job.id {
                return Err(ValidationError::AlreadyUploaded(id.clone()));
            }
            job.in_flight = Some(InFlight::Uploading);
            job.mark_dirty();
            vec![Effect::Upload {
                ticket: job.ticket(),
                file,
            }]
        }
        Msg::AnalyzeClicked => {
            ensure_idle(job)?;
            let job_id = match (job.state, &job.id) {
                (JobState::Uploaded, Some(id)) => id.clone(),
                (JobState::Unsubmitted, _) | (_, None) => {
                    return Err(ValidationError::NotUploaded)
                }
                (_, Some(id)) => return Err(ValidationError::AlreadyAnalyzed(id.clone())),
            };
            job.in_flight = Some(InFlight::Triggering);
            job.mark_dirty();
            vec![Effect::TriggerAnalysis {
                ticket: job.ticket(),
                job_id,
            }]
        }
        Msg::ResumePolling => {
            ensure_idle(job)?;
            let job_id = match (job.state, &job.id) {
                (JobState::Analyzing, Some(id)) => id.clone(),
                _ => return Err(ValidationError::NotAnalyzing),
            };
            job.in_flight = Some(InFlight::Polling);
            job.last_error = None;
            job.mark_dirty();
            vec![Effect::StartPolling {
                ticket: job.ticket(),
                job_id,
            }]
        }
        Msg::UploadFinished { ticket, result } => {
            if ticket != job.ticket() || job.in_flight != Some(InFlight::Uploading) {
                return Ok(Vec::new());
            }
            job.in_flight = None;
            match result {
                Ok(id) => {
                    job.id = Some(id);
                    job.state = JobState::Uploaded;
                    job.last_error = None;
                }
                Err(message) => job.last_error = Some(message),
            }
            job.mark_dirty();
            Vec::new()
        }
        Msg::AnalysisTriggered { ticket, result } => {
            if ticket != job.ticket() || job.in_flight != Some(InFlight::Triggering) {
                return Ok(Vec::new());
            }
            match (result, job.id.clone()) {
                (Ok(()), Some(job_id)) => {
                    job.state = JobState::Analyzing;
                    job.in_flight = Some(InFlight::Polling);
                    job.poll_attempts = 0;
                    job.server_state = None;
                    job.last_error = None;
                    job.mark_dirty();
                    vec![Effect::StartPolling { ticket, job_id }]
                }
                (Ok(()), None) => {
                    // Unreachable through the intents above: triggering requires an id.
                    job.in_flight = None;
                    job.mark_dirty();
                    Vec::new()
                }
                (Err(message), _) => {
                    job.in_flight = None;
                    job.last_error = Some(message);
                    job.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::PollProgress {
            ticket,
            attempt,
            server_state,
        } => {
            if is_live_poll(job, ticket) {
                job.poll_attempts = attempt;
                job.server_state = Some(server_state);
                job.mark_dirty();
            }
            Vec::new()
        }
        Msg::PollFinished { ticket, outcome } => {
            if !is_live_poll(job, ticket) {
                return Ok(Vec::new());
            }
            job.in_flight = None;
            match outcome {
                PollOutcome::Done(result) => {
                    job.state = JobState::Done;
                    job.server_state = Some("done".to_string());
                    job.result = Some(result);
                    job.last_error = None;
                }
                PollOutcome::Transport(message) => {
                    job.last_error = Some(message);
                }
                PollOutcome::NotFound => {
                    job.state = JobState::Failed;
                    job.last_error = Some("job not found on server".to_string());
                }
                PollOutcome::TimedOut { attempts } => {
                    job.state = JobState::Failed;
                    job.last_error = Some(format!("gave up after {attempts} polls"));
                }
                PollOutcome::Cancelled => {}
            }
            job.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    Ok(effects)
}

fn ensure_idle(job: &Job) -> Result<(), ValidationError> {
    match job.in_flight {
        Some(op) => Err(ValidationError::OperationInFlight(op)),
        None => Ok(()),
    }
}

fn cancel_in_flight(job: &Job) -> Vec<Effect> {
    match job.in_flight {
        Some(_) => vec![Effect::Cancel {
            ticket: job.ticket(),
        }],
        None => Vec::new(),
    }
}

// Results are cached once Done; a poll can only land while Analyzing.
fn is_live_poll(job: &Job, ticket: crate::JobTicket) -> bool {
    ticket == job.ticket()
        && job.state == JobState::Analyzing
        && job.in_flight == Some(InFlight::Polling)
}
