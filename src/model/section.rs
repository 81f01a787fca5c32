//! Section identity, metadata, and content handles

use serde::{Deserialize, Serialize};

/// Section index within the document. 0-indexed internally, 1-based for display.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SectionIndex(usize);

impl SectionIndex {
    /// Create a new SectionIndex from a raw 0-based value.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw 0-based index value.
    pub fn get(&self) -> usize {
        self.0
    }

    /// Get the 1-based index for display purposes.
    pub fn display(&self) -> usize {
        self.0 + 1
    }
}

impl From<usize> for SectionIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for SectionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a section takes part in the linear reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linearity {
    /// Reached by page turns.
    #[default]
    Yes,
    /// Only reachable by direct navigation (footnotes, cover pages).
    No,
}

impl Linearity {
    /// Whether page turns may land on this section.
    pub fn is_linear(self) -> bool {
        self == Self::Yes
    }
}

/// Metadata the section store knows without loading content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo {
    /// Position in reading order.
    pub index: SectionIndex,
    /// Document-relative href.
    pub href: String,
    /// Linear flag.
    pub linear: Linearity,
}

/// Layout lifecycle of a section as tracked by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionStatus {
    /// No content held.
    #[default]
    Unloaded,
    /// A load is in flight.
    Loading,
    /// Content is held (displayed or prefetched).
    Loaded,
    /// Content failed to lay out; page turns skip this section.
    Unusable,
}

/// Loaded content handle. The body is opaque to the paginator and only
/// interpreted by the render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionContent {
    /// Section this content belongs to.
    pub index: SectionIndex,
    /// Document-relative href.
    pub href: String,
    /// Raw section bytes.
    pub body: Vec<u8>,
}

impl SectionContent {
    /// Create a content handle.
    pub fn new(index: SectionIndex, href: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            index,
            href: href.into(),
            body,
        }
    }
}
