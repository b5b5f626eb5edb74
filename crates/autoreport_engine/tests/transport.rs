use std::time::Duration;

use autoreport_core::StudyFile;
use autoreport_engine::{
    poll_until_done, AnalysisOptions, FailureKind, HttpTransport, NoopPollSink, PollPolicy,
    ResultPayload, StudyUpload, Transport, TransportSettings,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&TransportSettings {
        base_url: server.uri(),
        ..TransportSettings::default()
    })
    .expect("transport")
}

fn done_body() -> serde_json::Value {
    json!({
        "job_id": "abc123",
        "state": "done",
        "normal": false,
        "confidence": 0.83,
        "impression": "Lesion in the left temporal lobe.",
        "findings": ["lesion, left temporal"],
        "downloads": {"dicom_sr": "/dl/sr", "json": "/dl/json"}
    })
}

#[tokio::test]
async fn submit_study_sends_multipart_and_returns_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_exists("content-type"))
        .and(body_string_contains("name=\"study\""))
        .and(body_string_contains("filename=\"scan.zip\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let upload = StudyUpload::new("scan.zip", b"PK fake zip".to_vec());

    let job_id = transport.submit_study(&upload).await.expect("upload ok");
    assert_eq!(job_id, "abc123");
}

#[tokio::test]
async fn submit_study_without_job_id_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .submit_study(&StudyUpload::new("scan.zip", b"PK".to_vec()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Protocol);
}

#[tokio::test]
async fn submit_study_server_error_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("zip extraction failed"))
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .submit_study(&StudyUpload::new("scan.zip", b"PK".to_vec()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "zip extraction failed");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let transport = HttpTransport::new(&TransportSettings {
        base_url: uri,
        connect_timeout: Duration::from_secs(2),
        ..TransportSettings::default()
    })
    .unwrap();

    let err = transport.fetch_result("abc123").await.unwrap_err();
    assert!(
        matches!(err.kind, FailureKind::Network | FailureKind::Timeout),
        "{err}"
    );
}

#[tokio::test]
async fn study_upload_reads_file_from_disk() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("scan.zip");
    std::fs::write(&path, b"PK\x03\x04").unwrap();

    let upload = StudyUpload::read(&StudyFile::from_path(&path)).await.unwrap();
    assert_eq!(upload.file_name, "scan.zip");
    assert_eq!(&upload.bytes[..], b"PK\x03\x04");

    let err = StudyUpload::read(&StudyFile::from_path(temp.path().join("missing.zip")))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Io);
}

#[tokio::test]
async fn trigger_analysis_sends_anatomy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/abc123"))
        .and(body_json(json!({"anatomy": "brain"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    transport_for(&server)
        .trigger_analysis("abc123", &AnalysisOptions::default())
        .await
        .expect("trigger ok");
}

#[tokio::test]
async fn slow_analysis_trigger_waits_past_the_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/abc123"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&TransportSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(500),
        trigger_timeout: Duration::from_secs(10),
        ..TransportSettings::default()
    })
    .unwrap();

    transport
        .trigger_analysis("abc123", &AnalysisOptions::default())
        .await
        .expect("trigger outlives the general request timeout");
}

#[tokio::test]
async fn analysis_trigger_times_out_on_its_own_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/abc123"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&TransportSettings {
        base_url: server.uri(),
        trigger_timeout: Duration::from_millis(300),
        ..TransportSettings::default()
    })
    .unwrap();

    let err = transport
        .trigger_analysis("abc123", &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[test]
fn default_trigger_timeout_covers_a_synchronous_analysis() {
    let settings = TransportSettings::default();
    assert!(settings.trigger_timeout >= Duration::from_secs(600));
    assert!(settings.trigger_timeout > settings.request_timeout);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(path("/analyze/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "job not found"})))
        .mount(&server)
        .await;
    Mock::given(path("/result/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let err = transport
        .trigger_analysis("nope", &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::JobNotFound);

    let err = transport.fetch_result("nope").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn fetch_result_parses_running_and_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/result/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"job_id": "abc123", "state": "running"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_body()))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    assert_eq!(
        transport.fetch_result("abc123").await.unwrap(),
        ResultPayload::InProgress {
            state: "running".to_string()
        }
    );
    let ResultPayload::Done(result) = transport.fetch_result("abc123").await.unwrap() else {
        panic!("expected done");
    };
    assert_eq!(result.findings, vec!["lesion, left temporal".to_string()]);
    assert_eq!(result.downloads.dicom_seg, None);
}

#[tokio::test]
async fn polling_over_http_issues_no_request_after_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/result/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "pending"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_body()))
        .expect(1)
        .mount(&server)
        .await;

    let policy = PollPolicy {
        interval: Duration::from_millis(20),
        ..PollPolicy::default()
    };
    let result = poll_until_done(
        &transport_for(&server),
        "abc123",
        &policy,
        &CancellationToken::new(),
        &NoopPollSink,
    )
    .await
    .expect("done");

    assert!(!result.normal);
    server.verify().await;
}
