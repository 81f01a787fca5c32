//! Tracing subscriber for the `reflow-pager` binary.
//!
//! The library only emits `tracing` events and spans; embedding hosts install
//! their own subscriber. The binary routes everything to a log file so the
//! JSON event stream on stdout stays machine-readable.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable: engine diagnostics at
/// info, dependencies only when they warn.
pub const DEFAULT_FILTER: &str = "warn,reflow_pager=info";

/// Error type for logging initialization failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("Failed to create log directory at {path:?}: {source}")]
    DirectoryCreation {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The log path has no usable file name.
    #[error("Invalid log file path: {0:?}")]
    InvalidPath(PathBuf),

    /// Another subscriber was installed first.
    #[error("Tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// Install the file subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Navigation and bake spans are logged when they close, with their timings.
/// The log directory is created when missing.
///
/// # Errors
///
/// Returns `LoggingError` when the path has no file name, the directory
/// cannot be created, or a subscriber is already installed.
pub fn init(log_path: &Path) -> Result<(), LoggingError> {
    let (directory, file_name) = split_log_path(log_path)?;
    std::fs::create_dir_all(directory).map_err(|source| LoggingError::DirectoryCreation {
        path: directory.to_path_buf(),
        source,
    })?;

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(rust_log.as_deref()))
        .with_writer(tracing_appender::rolling::never(directory, file_name))
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .try_init()
        .map_err(|_| LoggingError::SubscriberAlreadySet)
}

/// Filter for a `RUST_LOG` value; blank or invalid values use the default.
fn filter_for(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Directory and file name of a log path; a bare file name logs to the
/// working directory.
fn split_log_path(log_path: &Path) -> Result<(&Path, &str), LoggingError> {
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?;
    let directory = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((directory, file_name))
}
