//! Autoreport engine: transport, polling and effect execution.
mod artifacts;
mod config;
mod engine;
mod filename;
mod persist;
mod poll;
mod transport;
mod types;
mod wire;

pub use artifacts::{ArtifactFetcher, SavedArtifact};
pub use config::EngineConfig;
pub use engine::{EngineError, EngineHandle};
pub use filename::artifact_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{poll_until_done, NoopPollSink, PollError, PollPolicy, PollSink};
pub use transport::{AnalysisOptions, HttpTransport, StudyUpload, Transport, TransportSettings};
pub use types::{EngineEvent, FailureKind, TransportError};
pub use wire::{parse_result_payload, ResultPayload};
