//! Error types for reflow-pager.
//!
//! This module defines the error taxonomy using `thiserror` for structured error
//! handling. Errors compose via `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`PagerError`] - Top-level error for the binary (config, logging, document I/O, navigation)
//!   - [`NavigationError`] - Navigation rejected for a specific section
//!     - [`ContentError`] - Section content could not be laid out by the surface
//!   - [`SourceError`] - Section store could not supply content
//!   - [`CacheError`] - Geometry cache transport failure
//!
//! # Recovery Strategy
//!
//! Only [`ContentError`] is surfaced to callers of navigation, wrapped in
//! [`NavigationError::Content`]. Everything else is recovered where it happens:
//!
//! - [`InvalidMeasurement`]: bounded retry on the next settle tick, never surfaced
//! - [`CacheError`]: logged, treated as a cache miss (reads) or a no-op (writes)
//! - [`NavigationTimeoutError`]: logged, the stale lock is force-released
//! - [`SourceError`]: logged, navigation proceeds with an empty display

use std::path::PathBuf;
use thiserror::Error;

use super::section::SectionIndex;

/// Top-level error encompassing all failure modes of the binary.
#[derive(Debug, Error)]
pub enum PagerError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Tracing subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// Document description could not be read.
    #[error("Failed to read document {path}: {source}")]
    Document {
        /// Path of the document description.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Document description is not valid JSON for the simulated host.
    #[error("Invalid document {path}: {reason}")]
    InvalidDocument {
        /// Path of the document description.
        path: PathBuf,
        /// Parser error message.
        reason: String,
    },

    /// A navigation request was rejected.
    #[error("Navigation failed: {0}")]
    Navigation(#[from] NavigationError),
}

/// Section content that the render surface could not interpret.
///
/// The section is marked unusable and page turns skip over it.
///
/// # Examples
///
/// ```
/// use reflow_pager::model::error::ContentError;
///
/// let err = ContentError::Uninterpretable {
///     href: "ch02.xhtml".to_string(),
///     reason: "unexpected end of input".to_string(),
/// };
/// assert!(err.to_string().contains("ch02.xhtml"));
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// The surface could not parse or lay out the content.
    #[error("Cannot lay out {href}: {reason}")]
    Uninterpretable {
        /// Href of the offending section.
        href: String,
        /// Surface-provided reason.
        reason: String,
    },

    /// Content was handed to the surface with an empty body.
    #[error("Section {href} has no content")]
    Empty {
        /// Href of the offending section.
        href: String,
    },
}

/// The section store could not supply a section's content.
///
/// Cloneable so a single failed prefetch can be observed by every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// No section exists at the requested index.
    #[error("No section at index {0}")]
    NoSuchSection(SectionIndex),

    /// The store failed to read the section's bytes.
    #[error("Section {index} unavailable: {reason}")]
    Unavailable {
        /// Requested section.
        index: SectionIndex,
        /// Store-provided reason.
        reason: String,
    },
}

/// A geometry measurement that cannot be committed as a page count.
///
/// Raised for non-finite or non-positive extents, which a render surface reports
/// while layout is still settling.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("Invalid measurement: extent {extent} along reading axis")]
pub struct InvalidMeasurement {
    /// The rejected measurement.
    pub extent: f64,
}

/// Failures of the external geometry cache transport.
///
/// Never fatal: a failed read is a miss, a failed write is skipped.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure in a disk-backed store.
    #[error("Geometry cache I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored entry set could not be decoded or encoded.
    #[error("Geometry cache entry {key} is malformed: {reason}")]
    Malformed {
        /// Cache key of the entry set.
        key: String,
        /// Serializer message.
        reason: String,
    },

    /// Transport refused the operation.
    #[error("Geometry cache unavailable: {0}")]
    Unavailable(String),
}

/// The navigation lock watchdog fired.
///
/// Logged, never returned: the stale lock is cleared and the new request proceeds
/// as if no lock existed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Navigation lock held for {held_ms}ms (timeout {timeout_ms}ms); forcing release")]
pub struct NavigationTimeoutError {
    /// How long the lock had been held.
    pub held_ms: u64,
    /// Configured watchdog timeout.
    pub timeout_ms: u64,
}

/// A navigation request that was rejected for a specific section.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The target section's content could not be laid out.
    #[error("Section {index} is unusable: {source}")]
    Content {
        /// Target section.
        index: SectionIndex,
        /// Surface failure.
        #[source]
        source: ContentError,
    },

    /// The target index is outside the document.
    #[error("Section index {index} out of range (document has {count} sections)")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of sections in the document.
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_error_is_wrapped_by_navigation_error() {
        let source = ContentError::Empty {
            href: "ch01.xhtml".to_string(),
        };
        let err = NavigationError::Content {
            index: SectionIndex::new(3),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("Section 3"), "got: {msg}");
        assert!(msg.contains("ch01.xhtml"), "got: {msg}");
    }

    #[test]
    fn navigation_error_converts_to_pager_error() {
        fn navigate() -> Result<(), PagerError> {
            Err(NavigationError::OutOfRange { index: 9, count: 2 })?;
            Ok(())
        }
        let err = navigate().unwrap_err();
        assert!(matches!(err, PagerError::Navigation(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn timeout_error_reports_both_durations() {
        let err = NavigationTimeoutError {
            held_ms: 512,
            timeout_ms: 400,
        };
        let msg = err.to_string();
        assert!(msg.contains("512ms"));
        assert!(msg.contains("400ms"));
    }

    #[test]
    fn invalid_measurement_displays_extent() {
        let err = InvalidMeasurement { extent: f64::NAN };
        assert!(err.to_string().contains("NaN"));
    }
}
