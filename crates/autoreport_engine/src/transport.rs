use std::time::Duration;

use autoreport_core::{JobId, StudyFile};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use report_logging::{report_debug, report_info, short_job_id};
use url::Url;

use crate::wire::{parse_result_payload, parse_upload_response, AnalyzeRequest, ResultPayload};
use crate::{FailureKind, TransportError};

/// Multipart field carrying the study archive.
pub const STUDY_FIELD: &str = "study";
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// `POST /analyze` only answers once the analysis has finished.
    pub trigger_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            trigger_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Side parameters sent with every analysis trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub anatomy: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            anatomy: "brain".to_string(),
        }
    }
}

/// A study archive loaded into memory for upload.
#[derive(Debug, Clone)]
pub struct StudyUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl StudyUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn read(file: &StudyFile) -> Result<Self, TransportError> {
        let bytes = tokio::fs::read(&file.path).await.map_err(|err| {
            TransportError::new(
                FailureKind::Io,
                format!("{}: {err}", file.path.display()),
            )
        })?;
        Ok(Self::new(file.file_name.clone(), bytes))
    }
}

/// The three remote operations of the analysis service.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// `POST /upload`; the server starts tracking a new job.
    async fn submit_study(&self, upload: &StudyUpload) -> Result<JobId, TransportError>;

    /// `POST /analyze/{job_id}`. Not idempotent as far as this client knows.
    async fn trigger_analysis(
        &self,
        job_id: &str,
        options: &AnalysisOptions,
    ) -> Result<(), TransportError>;

    /// `GET /result/{job_id}`.
    async fn fetch_result(&self, job_id: &str) -> Result<ResultPayload, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    trigger_timeout: Duration,
}

impl HttpTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            trigger_timeout: settings.trigger_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::new(FailureKind::InvalidUrl, self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn submit_study(&self, upload: &StudyUpload) -> Result<JobId, TransportError> {
        let url = self.endpoint(&["upload"])?;
        report_debug!(
            "Uploading study {} ({} bytes) to {}",
            upload.file_name,
            upload.bytes.len(),
            url
        );
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str("application/zip")
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))?;
        let form = Form::new().part(STUDY_FIELD, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = read_body(ensure_success(response, None).await?).await?;
        let job_id = parse_upload_response(&body)?;
        report_info!("Study {} uploaded as job {}", upload.file_name, job_id);
        Ok(job_id)
    }

    async fn trigger_analysis(
        &self,
        job_id: &str,
        options: &AnalysisOptions,
    ) -> Result<(), TransportError> {
        let url = self.endpoint(&["analyze", job_id])?;
        let response = self
            .client
            .post(url)
            .timeout(self.trigger_timeout)
            .json(&AnalyzeRequest {
                anatomy: &options.anatomy,
            })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response, Some(job_id)).await?;
        report_info!(
            "Analysis triggered for job {} (anatomy={})",
            short_job_id(job_id),
            options.anatomy
        );
        Ok(())
    }

    async fn fetch_result(&self, job_id: &str) -> Result<ResultPayload, TransportError> {
        let url = self.endpoint(&["result", job_id])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let body = read_body(ensure_success(response, Some(job_id)).await?).await?;
        parse_result_payload(&body)
    }
}

/// Maps non-2xx responses; a 404 on a job-scoped call means the job is gone.
pub(crate) async fn ensure_success(
    response: Response,
    job_id: Option<&str>,
) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(job_id) = job_id {
            return Err(TransportError::new(FailureKind::JobNotFound, job_id));
        }
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(TransportError::new(
        FailureKind::HttpStatus(status.as_u16()),
        if body.is_empty() { status.to_string() } else { body },
    ))
}

async fn read_body(response: Response) -> Result<Bytes, TransportError> {
    response.bytes().await.map_err(map_reqwest_error)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return TransportError::new(FailureKind::InvalidUrl, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
