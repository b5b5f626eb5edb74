//! Terminal driver: wires the core state machine to the engine.
mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod report;

pub use app::run_app;
