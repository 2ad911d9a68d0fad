//! Logging.
//!
//! Process-wide diagnostics go through `tracing` (stderr, optionally a daily
//! rolling file as well). Each job additionally gets a [`JobLogger`] writing
//! `<logs_dir>/<job_id>.log`.
//!
//! # Example
//!
//! ```no_run
//! use vidoc_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("4f1c", "output/logs", LogConfig::default(), None).unwrap();
//! logger.phase("Transcribing");
//! logger.warn("No speech in the first minute");
//! logger.progress(30);
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, LogSink, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}

/// Initialize the global tracing subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_level`. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(env_filter(default_level))
        .try_init();
}

/// Initialize tracing to stderr plus a daily rolling `vidoc.log` in `dir`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    dir: impl AsRef<Path>,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir.as_ref())?;
    let appender = tracing_appender::rolling::daily(dir.as_ref(), "vidoc.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter(default_level))
        .try_init();

    Ok(guard)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
