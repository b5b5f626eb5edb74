use std::sync::Once;

use autoreport_core::{
    update, AnalysisResult, Downloads, Effect, InFlight, Job, JobState, JobTicket, Msg,
    PollOutcome, StudyFile,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(report_logging::initialize_for_tests);
}

fn send(job: Job, msg: Msg) -> (Job, Vec<Effect>) {
    let (job, result) = update(job, msg);
    (job, result.expect("message accepted"))
}

fn lesion_result() -> AnalysisResult {
    AnalysisResult {
        impression: "Focal lesion in the left temporal lobe.".to_string(),
        normal: false,
        confidence: 0.83,
        findings: vec!["lesion, left temporal".to_string()],
        downloads: Downloads {
            dicom_sr: "/dl/sr".to_string(),
            dicom_seg: None,
            json: "/dl/json".to_string(),
            thumbnails: None,
        },
    }
}

/// Drives a fresh job through select → upload → analyze.
fn analyzing(job_id: &str) -> (Job, JobTicket) {
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));
    let ticket = job.ticket();
    let (job, _) = send(job, Msg::UploadClicked);
    let (job, _) = send(
        job,
        Msg::UploadFinished {
            ticket,
            result: Ok(job_id.to_string()),
        },
    );
    let (job, _) = send(job, Msg::AnalyzeClicked);
    let (job, _) = send(job, Msg::AnalysisTriggered { ticket, result: Ok(()) });
    (job, ticket)
}

#[test]
fn select_file_keeps_job_unsubmitted() {
    init_logging();
    let (mut job, effects) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));

    assert!(effects.is_empty());
    assert_eq!(job.state(), JobState::Unsubmitted);
    assert_eq!(job.id(), None);
    assert_eq!(job.file().map(|f| f.file_name.as_str()), Some("scan.zip"));
    assert!(job.view().can_upload);
    assert!(job.consume_dirty());
}

#[test]
fn upload_records_job_id_and_moves_to_uploaded() {
    init_logging();
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));
    let ticket = job.ticket();

    let (job, effects) = send(job, Msg::UploadClicked);
    assert_eq!(
        effects,
        vec![Effect::Upload {
            ticket,
            file: StudyFile::from_path("scan.zip"),
        }]
    );
    assert_eq!(job.in_flight(), Some(InFlight::Uploading));
    assert_eq!(job.state(), JobState::Unsubmitted);

    let (job, effects) = send(
        job,
        Msg::UploadFinished {
            ticket,
            result: Ok("abc123".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(job.state(), JobState::Uploaded);
    assert_eq!(job.id(), Some("abc123"));
    assert_eq!(job.in_flight(), None);
    assert!(job.view().can_analyze);
}

#[test]
fn failed_upload_can_be_retried_without_reselecting() {
    init_logging();
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));
    let ticket = job.ticket();
    let (job, _) = send(job, Msg::UploadClicked);
    let (job, _) = send(
        job,
        Msg::UploadFinished {
            ticket,
            result: Err("connection refused".to_string()),
        },
    );

    assert_eq!(job.state(), JobState::Unsubmitted);
    assert_eq!(job.id(), None);
    assert_eq!(job.last_error(), Some("connection refused"));

    let (job, effects) = send(job, Msg::UploadClicked);
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::Upload { .. }));
    assert_eq!(job.in_flight(), Some(InFlight::Uploading));
}

#[test]
fn failed_trigger_stays_uploaded_and_can_be_retried() {
    init_logging();
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));
    let ticket = job.ticket();
    let (job, _) = send(job, Msg::UploadClicked);
    let (job, _) = send(
        job,
        Msg::UploadFinished {
            ticket,
            result: Ok("abc123".to_string()),
        },
    );
    let (job, effects) = send(job, Msg::AnalyzeClicked);
    assert_eq!(
        effects,
        vec![Effect::TriggerAnalysis {
            ticket,
            job_id: "abc123".to_string(),
        }]
    );

    let (job, _) = send(
        job,
        Msg::AnalysisTriggered {
            ticket,
            result: Err("http status 500".to_string()),
        },
    );
    assert_eq!(job.state(), JobState::Uploaded);
    assert_eq!(job.last_error(), Some("http status 500"));

    let (_job, effects) = send(job, Msg::AnalyzeClicked);
    assert_eq!(effects.len(), 1);
}

#[test]
fn trigger_success_starts_polling() {
    init_logging();
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("scan.zip")));
    let ticket = job.ticket();
    let (job, _) = send(job, Msg::UploadClicked);
    let (job, _) = send(
        job,
        Msg::UploadFinished {
            ticket,
            result: Ok("abc123".to_string()),
        },
    );
    let (job, _) = send(job, Msg::AnalyzeClicked);
    let (job, effects) = send(job, Msg::AnalysisTriggered { ticket, result: Ok(()) });

    assert_eq!(job.state(), JobState::Analyzing);
    assert_eq!(job.in_flight(), Some(InFlight::Polling));
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            ticket,
            job_id: "abc123".to_string(),
        }]
    );
}

#[test]
fn pending_then_done_stores_result() {
    init_logging();
    let (job, ticket) = analyzing("abc123");

    let (job, _) = send(
        job,
        Msg::PollProgress {
            ticket,
            attempt: 1,
            server_state: "pending".to_string(),
        },
    );
    assert_eq!(job.state(), JobState::Analyzing);
    assert_eq!(job.view().poll_attempts, 1);
    assert_eq!(job.view().server_state.as_deref(), Some("pending"));

    let (job, effects) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::Done(lesion_result()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.in_flight(), None);
    assert_eq!(job.result(), Some(&lesion_result()));

    let view = job.view().result.expect("result view");
    assert_eq!(view.status_label, "Abnormal");
    assert_eq!(view.confidence_label, "83%");
    assert_eq!(view.findings, vec!["lesion, left temporal".to_string()]);
    assert!(!view.has_segmentation());
}

#[test]
fn done_result_is_never_replaced() {
    init_logging();
    let (job, ticket) = analyzing("abc123");
    let (job, _) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::Done(lesion_result()),
        },
    );

    let mut other = lesion_result();
    other.normal = true;
    other.confidence = 0.99;
    let before = job.clone();
    let (job, effects) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::Done(other),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(job, before);
    assert_eq!(job.result(), Some(&lesion_result()));
}

#[test]
fn transport_failure_mid_poll_stays_analyzing() {
    init_logging();
    let (job, ticket) = analyzing("abc123");

    let (job, _) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::Transport("network error: connection reset".to_string()),
        },
    );
    assert_eq!(job.state(), JobState::Analyzing);
    assert_eq!(job.in_flight(), None);
    assert_eq!(job.last_error(), Some("network error: connection reset"));
    assert!(job.view().status_line().contains("error: network error"));

    let (job, effects) = send(job, Msg::ResumePolling);
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            ticket,
            job_id: "abc123".to_string(),
        }]
    );
    assert_eq!(job.last_error(), None);
    assert_eq!(job.in_flight(), Some(InFlight::Polling));
}

#[test]
fn missing_job_or_timeout_fails_the_job() {
    init_logging();
    let (job, ticket) = analyzing("abc123");
    let (job, _) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::NotFound,
        },
    );
    assert_eq!(job.state(), JobState::Failed);
    assert_eq!(job.id(), Some("abc123"));

    let (job, ticket) = analyzing("def456");
    let (job, _) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::TimedOut { attempts: 900 },
        },
    );
    assert_eq!(job.state(), JobState::Failed);
    assert_eq!(job.last_error(), Some("gave up after 900 polls"));
}

#[test]
fn selecting_new_file_cancels_polling_and_ignores_stale_responses() {
    init_logging();
    let (job, old_ticket) = analyzing("abc123");

    let (job, effects) = send(job, Msg::FileSelected(StudyFile::from_path("second.zip")));
    assert_eq!(effects, vec![Effect::Cancel { ticket: old_ticket }]);
    assert_ne!(job.ticket(), old_ticket);
    assert_eq!(job.state(), JobState::Unsubmitted);
    assert_eq!(job.id(), None);
    assert_eq!(job.result(), None);

    let before = job.clone();
    let (job, effects) = send(
        job,
        Msg::PollProgress {
            ticket: old_ticket,
            attempt: 4,
            server_state: "running".to_string(),
        },
    );
    assert!(effects.is_empty());
    let (job, effects) = send(
        job,
        Msg::PollFinished {
            ticket: old_ticket,
            outcome: PollOutcome::Done(lesion_result()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(job, before);
}

#[test]
fn stale_upload_completion_does_not_touch_new_job() {
    init_logging();
    let (job, _) = send(Job::new(), Msg::FileSelected(StudyFile::from_path("first.zip")));
    let old_ticket = job.ticket();
    let (job, _) = send(job, Msg::UploadClicked);

    let (job, effects) = send(job, Msg::FileSelected(StudyFile::from_path("second.zip")));
    assert_eq!(effects, vec![Effect::Cancel { ticket: old_ticket }]);

    let (job, _) = send(
        job,
        Msg::UploadFinished {
            ticket: old_ticket,
            result: Ok("old-job".to_string()),
        },
    );
    assert_eq!(job.state(), JobState::Unsubmitted);
    assert_eq!(job.id(), None);
    assert_eq!(job.in_flight(), None);
}

#[test]
fn reset_discards_file_and_result() {
    init_logging();
    let (job, ticket) = analyzing("abc123");
    let (job, _) = send(
        job,
        Msg::PollFinished {
            ticket,
            outcome: PollOutcome::Done(lesion_result()),
        },
    );

    let (job, effects) = send(job, Msg::ResetClicked);
    assert!(effects.is_empty());
    assert_eq!(job.state(), JobState::Unsubmitted);
    assert_eq!(job.file(), None);
    assert_eq!(job.result(), None);
    assert_eq!(job.view().result, None);
    assert!(!job.view().can_upload);
}
