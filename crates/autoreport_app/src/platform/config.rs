use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use autoreport_engine::{AnalysisOptions, EngineConfig, PollPolicy, TransportSettings};
use report_logging::{report_info, report_warn};
use serde::{Deserialize, Serialize};

use super::logging::LogDestination;

pub const CONFIG_FILENAME: &str = "autoreport.ron";

/// Operator settings, read from a RON file. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub anatomy: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub poll_timeout_secs: Option<u64>,
    /// How often a polling loop stopped by a transport error is restarted.
    pub max_poll_resumes: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Wait for `POST /analyze`, which returns only when the analysis is finished.
    pub trigger_timeout_secs: u64,
    pub max_artifact_mb: u64,
    pub output_dir: PathBuf,
    pub download_artifacts: bool,
    pub log: LogDestination,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            base_url: engine.transport.base_url,
            anatomy: engine.analysis.anatomy,
            poll_interval_ms: engine.poll.interval.as_millis() as u64,
            max_poll_attempts: engine.poll.max_attempts,
            poll_timeout_secs: engine.poll.timeout.map(|t| t.as_secs()),
            max_poll_resumes: 3,
            connect_timeout_secs: engine.transport.connect_timeout.as_secs(),
            request_timeout_secs: engine.transport.request_timeout.as_secs(),
            trigger_timeout_secs: engine.transport.trigger_timeout.as_secs(),
            max_artifact_mb: engine.max_artifact_bytes / (1024 * 1024),
            output_dir: PathBuf::from("output"),
            download_artifacts: true,
            log: LogDestination::Terminal,
            verbose: false,
        }
    }
}

impl AppConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            transport: TransportSettings {
                base_url: self.base_url.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                trigger_timeout: Duration::from_secs(self.trigger_timeout_secs),
            },
            analysis: AnalysisOptions {
                anatomy: self.anatomy.clone(),
            },
            poll: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.max_poll_attempts,
                timeout: self.poll_timeout_secs.map(Duration::from_secs),
            },
            max_artifact_bytes: self.max_artifact_mb * 1024 * 1024,
        }
    }
}

/// Loads the config file. A missing default file yields defaults; a missing
/// explicitly requested file, or one that does not parse, is an error.
pub(crate) fn load_config(path: &Path, explicit: bool) -> anyhow::Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };

    let config: AppConfig =
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    if config.poll_interval_ms == 0 {
        report_warn!("poll_interval_ms is 0; polls will be issued back to back");
    }
    report_info!("Loaded config from {:?}", path);
    Ok(config)
}
