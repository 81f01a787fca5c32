//! Tracking sections, sentinels, and persisted cache entries

use serde::{Deserialize, Serialize};

use super::geometry::Axis;

/// Identifier of a tracking section within its section's content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingId(String);

impl TrackingId {
    /// Create a tracking id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sub-element whose rendered extent is expensive to recompute.
///
/// # Invariants
/// - `baked` implies `inline_extent`, `block_extent` and `block_start` came from one bake
/// - `skip_cache` sections are never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSection {
    /// Id within the section.
    pub id: TrackingId,
    /// Extent along the inline axis.
    pub inline_extent: f64,
    /// Extent along the block axis (summed over fragments).
    pub block_extent: f64,
    /// Absolute block-axis offset from the start of the section.
    pub block_start: f64,
    /// Extents are frozen for the current cache key.
    pub baked: bool,
    /// Own writing axis contradicts the section's; measured fresh every bake.
    pub skip_cache: bool,
}

impl TrackingSection {
    /// Create an unbaked tracking section.
    pub fn new(id: TrackingId, skip_cache: bool) -> Self {
        Self {
            id,
            inline_extent: 0.0,
            block_extent: 0.0,
            block_start: 0.0,
            baked: false,
            skip_cache,
        }
    }

    /// Snapshot as a cache entry.
    pub fn to_entry(&self) -> CacheEntry {
        CacheEntry {
            id: self.id.clone(),
            inline_extent: self.inline_extent,
            block_extent: self.block_extent,
            block_start: self.block_start,
        }
    }
}

/// Persisted extents for one tracking section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Tracking section id.
    pub id: TrackingId,
    /// Extent along the inline axis.
    pub inline_extent: f64,
    /// Extent along the block axis.
    pub block_extent: f64,
    /// Absolute block-axis offset.
    pub block_start: f64,
}

/// Description of a tracking section as discovered by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingDescriptor {
    /// Id within the section.
    pub id: TrackingId,
    /// The element's own writing axis, when it declares one.
    pub axis: Option<Axis>,
}

/// Ordinal of a sentinel within its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SentinelId(usize);

impl SentinelId {
    /// Create a sentinel id from its ordinal.
    pub fn new(ordinal: usize) -> Self {
        Self(ordinal)
    }

    /// Raw ordinal.
    pub fn get(&self) -> usize {
        self.0
    }
}

/// Whether a sentinel marks real content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SentinelKind {
    /// Boundary inside text content.
    #[default]
    Content,
    /// Structural marker node; never bounds a visible range.
    Marker,
}

/// A lightweight position marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    /// Ordinal within the section.
    pub id: SentinelId,
    /// Index of the owning tracking section in the outline.
    pub owner: usize,
    /// Content or marker.
    pub kind: SentinelKind,
}

/// Structure of a laid-out section as reported by the surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentOutline {
    /// Tracking sections in document order.
    pub tracking: Vec<TrackingDescriptor>,
    /// Sentinels in document order; `sentinels[i].id.get() == i`.
    pub sentinels: Vec<Sentinel>,
}
