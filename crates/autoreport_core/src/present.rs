//! Maps a finished [`AnalysisResult`] into display-ready data.

use std::fmt::Write;

use crate::AnalysisResult;

pub const DISCLAIMER: &str = "AI-generated. Research use only.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub label: &'static str,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub status_label: &'static str,
    pub normal: bool,
    pub confidence_label: String,
    pub impression: String,
    pub findings: Vec<String>,
    pub downloads: Vec<DownloadLink>,
    /// Empty when the server sent no thumbnails.
    pub thumbnails: Vec<String>,
    pub disclaimer: &'static str,
}

impl ResultView {
    pub fn has_segmentation(&self) -> bool {
        self.downloads.iter().any(|link| link.label == SEG_LABEL)
    }
}

const SR_LABEL: &str = "DICOM SR";
const SEG_LABEL: &str = "DICOM SEG";
const JSON_LABEL: &str = "JSON";

pub fn present(result: &AnalysisResult) -> ResultView {
    let mut downloads = vec![DownloadLink {
        label: SR_LABEL,
        href: result.downloads.dicom_sr.clone(),
    }];
    if let Some(seg) = &result.downloads.dicom_seg {
        downloads.push(DownloadLink {
            label: SEG_LABEL,
            href: seg.clone(),
        });
    }
    downloads.push(DownloadLink {
        label: JSON_LABEL,
        href: result.downloads.json.clone(),
    });

    ResultView {
        status_label: if result.normal { "Normal" } else { "Abnormal" },
        normal: result.normal,
        confidence_label: format_confidence(result.confidence),
        impression: result.impression.clone(),
        findings: result.findings.clone(),
        downloads,
        thumbnails: result.downloads.thumbnails.clone().unwrap_or_default(),
        disclaimer: DISCLAIMER,
    }
}

/// Nearest whole percent, clamped to `0%..=100%`.
pub(crate) fn format_confidence(confidence: f64) -> String {
    let percent = if confidence.is_nan() {
        0.0
    } else {
        (confidence.clamp(0.0, 1.0) * 100.0).round()
    };
    format!("{}%", percent as u8)
}

/// Plain-text rendering used by the terminal driver and the saved report.
pub fn render_text(view: &ResultView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "IMPRESSION");
    let _ = writeln!(out, "{}", view.impression);
    let _ = writeln!(out);
    let _ = writeln!(out, "{} ({})", view.status_label, view.confidence_label);
    if !view.findings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "FINDINGS");
        for finding in &view.findings {
            let _ = writeln!(out, "- {finding}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "DOWNLOADS");
    for link in &view.downloads {
        let _ = writeln!(out, "{}: {}", link.label, link.href);
    }
    if !view.thumbnails.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "THUMBNAILS");
        for thumb in &view.thumbnails {
            let _ = writeln!(out, "{thumb}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", view.disclaimer);
    out
}
