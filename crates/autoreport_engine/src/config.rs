use crate::{AnalysisOptions, PollPolicy, TransportSettings};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub transport: TransportSettings,
    /// Sent on every analysis trigger; not operator-editable.
    pub analysis: AnalysisOptions,
    pub poll: PollPolicy,
    pub max_artifact_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            analysis: AnalysisOptions::default(),
            poll: PollPolicy::default(),
            max_artifact_bytes: 256 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.transport.base_url = base_url.into();
        config
    }
}
