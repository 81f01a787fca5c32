//! Visible range results

use serde::Serialize;

use crate::model::SentinelId;

/// Half-open range `[start, end)` over sentinel ordinals.
///
/// # Invariants
/// - `start <= end`
/// - A collapsed range (`start == end`) means no content is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ContentRange {
    /// First visible sentinel ordinal (inclusive).
    pub start: usize,
    /// One past the last visible sentinel ordinal (exclusive).
    pub end: usize,
}

impl ContentRange {
    /// Create a range.
    ///
    /// # Panics
    /// In debug builds, panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "start {} must not exceed end {}", start, end);
        Self { start, end }
    }

    /// Range spanning a first and last sentinel, both inclusive.
    pub fn spanning(first: SentinelId, last: SentinelId) -> Self {
        Self::new(first.get(), last.get() + 1)
    }

    /// The zero-width range at document start.
    pub fn collapsed_at_start() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Whether the range covers no sentinel.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Number of sentinels covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Same as [`Self::is_collapsed`].
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Whether a sentinel lies inside the range.
    pub fn contains(&self, sentinel: SentinelId) -> bool {
        (self.start..self.end).contains(&sentinel.get())
    }

    /// First covered sentinel, if any.
    pub fn first(&self) -> Option<SentinelId> {
        (!self.is_collapsed()).then(|| SentinelId::new(self.start))
    }
}

/// Result of one visible-range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleScan {
    /// Visible content range.
    pub range: ContentRange,
    /// Whether this query forced tracking sections visible to recover from a blank screen.
    pub corrected: bool,
}
