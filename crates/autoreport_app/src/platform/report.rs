use std::path::{Path, PathBuf};

use anyhow::Context;
use autoreport_core::{render_text, ResultView};
use autoreport_engine::AtomicFileWriter;
use chrono::Utc;
use report_logging::report_info;
use serde::{Deserialize, Serialize};

/// Machine-readable companion to the text report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ReportRecord {
    pub job_id: String,
    pub generated_utc: String,
    pub normal: bool,
    pub confidence: String,
    pub findings: Vec<String>,
    pub artifacts: Vec<PathBuf>,
}

pub(crate) fn report_filename(job_id: &str, extension: &str) -> String {
    let safe: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("report-{safe}.{extension}")
}

/// Writes `report-<job>.txt` with a small header followed by the rendered result.
pub(crate) fn save_report(output_dir: &Path, job_id: &str, view: &ResultView) -> anyhow::Result<PathBuf> {
    let mut content = format!(
        "Job: {job_id}\nGenerated: {}\n\n",
        Utc::now().to_rfc3339()
    );
    content.push_str(&render_text(view));

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer
        .write(&report_filename(job_id, "txt"), content.as_bytes())
        .with_context(|| format!("writing report to {}", output_dir.display()))?;
    report_info!("Saved report to {}", path.display());
    Ok(path)
}

pub(crate) fn save_record(
    output_dir: &Path,
    job_id: &str,
    view: &ResultView,
    artifacts: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    let record = ReportRecord {
        job_id: job_id.to_string(),
        generated_utc: Utc::now().to_rfc3339(),
        normal: view.normal,
        confidence: view.confidence_label.clone(),
        findings: view.findings.clone(),
        artifacts: artifacts.to_vec(),
    };
    let content = ron::ser::to_string_pretty(&record, ron::ser::PrettyConfig::new())
        .context("serializing report record")?;

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    let path = writer
        .write(&report_filename(job_id, "ron"), content.as_bytes())
        .with_context(|| format!("writing report record to {}", output_dir.display()))?;
    report_info!("Saved report record to {}", path.display());
    Ok(path)
}
