//! JSON bodies exchanged with the analysis service.
//!
//! Responses are read into lenient structs first and then validated, so a
//! missing field fails here instead of reaching the presenter.

use autoreport_core::{AnalysisResult, Downloads};
use serde::{Deserialize, Serialize};

use crate::TransportError;

pub(crate) const DONE_STATE: &str = "done";

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub anatomy: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    state: Option<String>,
    impression: Option<String>,
    normal: Option<bool>,
    confidence: Option<f64>,
    findings: Option<Vec<String>>,
    downloads: Option<RawDownloads>,
}

#[derive(Debug, Deserialize)]
struct RawDownloads {
    dicom_sr: Option<String>,
    dicom_seg: Option<String>,
    json: Option<String>,
    thumbnails: Option<Vec<String>>,
}

/// Server-side view of a job, as returned by `GET /result/{job_id}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    /// Any state other than `done`, e.g. `pending` or `running`.
    InProgress { state: String },
    Done(AnalysisResult),
}

impl ResultPayload {
    pub fn is_done(&self) -> bool {
        matches!(self, ResultPayload::Done(_))
    }
}

pub(crate) fn parse_upload_response(body: &[u8]) -> Result<String, TransportError> {
    let response: UploadResponse = serde_json::from_slice(body)
        .map_err(|err| TransportError::protocol(format!("upload response: {err}")))?;
    response
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TransportError::protocol("upload response has no job_id"))
}

pub fn parse_result_payload(body: &[u8]) -> Result<ResultPayload, TransportError> {
    let raw: RawResult = serde_json::from_slice(body)
        .map_err(|err| TransportError::protocol(format!("result response: {err}")))?;
    let state = raw
        .state
        .ok_or_else(|| TransportError::protocol("result response has no state"))?;
    if state != DONE_STATE {
        return Ok(ResultPayload::InProgress { state });
    }

    let confidence = require(raw.confidence, "confidence")?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(TransportError::protocol(format!(
            "confidence {confidence} outside [0, 1]"
        )));
    }
    let downloads = require(raw.downloads, "downloads")?;

    Ok(ResultPayload::Done(AnalysisResult {
        impression: require(raw.impression, "impression")?,
        normal: require(raw.normal, "normal")?,
        confidence,
        findings: require(raw.findings, "findings")?,
        downloads: Downloads {
            dicom_sr: require(downloads.dicom_sr, "downloads.dicom_sr")?,
            dicom_seg: downloads.dicom_seg.filter(|href| !href.is_empty()),
            json: require(downloads.json, "downloads.json")?,
            thumbnails: downloads.thumbnails,
        },
    }))
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, TransportError> {
    value.ok_or_else(|| TransportError::protocol(format!("done result is missing {field}")))
}
