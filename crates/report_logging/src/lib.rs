#![deny(missing_docs)]
//! Shared logging utilities for the autoreport workspace.
//!
//! All crates log through the `report_*` macros so the backend can be swapped
//! in one place. The terminal driver installs the real logger; tests use
//! [`initialize_for_tests`].

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! report_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! report_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! report_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! report_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! report_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Shortens a job id for log lines: `abcd1234-…` becomes `abcd1234`.
///
/// Server ids are UUIDs; the first segment is enough to correlate lines.
pub fn short_job_id(job_id: &str) -> &str {
    match job_id.find('-') {
        Some(idx) if idx > 0 => &job_id[..idx],
        _ => job_id,
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::short_job_id;

    #[test]
    fn short_job_id_keeps_first_uuid_segment() {
        assert_eq!(
            short_job_id("3f2c9a10-5d1e-4b7a-9c2f-0e8d7a6b5c4d"),
            "3f2c9a10"
        );
    }

    #[test]
    fn short_job_id_passes_plain_ids_through() {
        assert_eq!(short_job_id("abc123"), "abc123");
        assert_eq!(short_job_id("-leading"), "-leading");
    }
}
