//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod anchor;
pub mod error;
pub mod event;
pub mod geometry;
pub mod section;
pub mod tracking;

// Re-export for convenience
pub use anchor::{Anchor, AnchorResolver};
pub use error::{
    CacheError, ContentError, InvalidMeasurement, NavigationError, NavigationTimeoutError,
    PagerError, SourceError,
};
pub use event::{PagerEvent, RelocateEvent, RelocateReason};
pub use geometry::{Axis, Direction, Flow, PhysicalAxis, Progression, Rect, Viewport, WritingMode};
pub use section::{Linearity, SectionContent, SectionIndex, SectionInfo, SectionStatus};
pub use tracking::{
    CacheEntry, ContentOutline, Sentinel, SentinelId, SentinelKind, TrackingDescriptor,
    TrackingId, TrackingSection,
};
