//! Host rendering surface interface.
//!
//! The surface performs real text layout (fonts, wrapping, styling) and is
//! treated as a black box. The paginator talks to it through a narrow
//! geometry-query interface:
//!
//! - `load` / `detect_direction` / `outline`: lay out content and describe it
//! - `apply_layout` / `settle`: apply column or scroll directives, wait for a render tick
//! - `measure`: possibly multi-fragment rectangles for content, tracking sections, sentinels
//! - `freeze_extent` / `set_container_extent` / `scroll_to`: commit geometry decisions
//! - [`VisibilityProbe`]: bounded visibility observation of sentinels

use futures::future::LocalBoxFuture;

use crate::model::{
    ContentError, ContentOutline, Flow, Rect, SectionContent, SentinelId, TrackingId, Viewport,
    WritingMode,
};

/// Layout directives applied to one section.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDirectives {
    /// Paginated columns or continuous scroll.
    pub flow: Flow,
    /// Page (viewport) dimensions.
    pub viewport: Viewport,
    /// Gap between columns.
    pub gap: f64,
    /// Columns per page in paginated flow.
    pub max_columns: u8,
    /// Fingerprint of the host's typographic settings (font, size, spacing).
    pub settings_fingerprint: String,
}

impl LayoutDirectives {
    /// Directives for a viewport with a single column and no gap.
    pub fn new(flow: Flow, viewport: Viewport) -> Self {
        Self {
            flow,
            viewport,
            gap: 0.0,
            max_columns: 1,
            settings_fingerprint: String::new(),
        }
    }

    /// Set the settings fingerprint.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.settings_fingerprint = fingerprint.into();
        self
    }
}

/// What to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureTarget<'a> {
    /// The whole laid-out section.
    Content,
    /// One tracking section.
    Tracking(&'a TrackingId),
    /// One sentinel.
    Sentinel(SentinelId),
}

/// Bounded visibility observation over sentinels.
///
/// Mirrors an intersection observer: only observed sentinels report visibility.
pub trait VisibilityProbe {
    /// Start observing a sentinel.
    fn observe(&self, sentinel: SentinelId);

    /// Stop observing a sentinel.
    fn unobserve(&self, sentinel: SentinelId);

    /// Visibility of an observed sentinel; `None` if it is not observed.
    fn is_visible(&self, sentinel: SentinelId) -> Option<bool>;

    /// Force a tracking section to render even when off-screen.
    fn force_visible(&self, id: &TrackingId);
}

/// The host rendering surface.
pub trait RenderSurface: VisibilityProbe {
    /// Lay out section content; resolves once the surface signals completion.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` when the content cannot be interpreted.
    fn load<'a>(
        &'a self,
        content: &'a SectionContent,
    ) -> LocalBoxFuture<'a, Result<(), ContentError>>;

    /// Writing mode of the loaded content.
    fn detect_direction(&self) -> WritingMode;

    /// Tracking sections and sentinels of the loaded content.
    fn outline(&self) -> ContentOutline;

    /// Apply column/scroll styling. Requests one layout pass.
    fn apply_layout(&self, directives: &LayoutDirectives, writing_mode: WritingMode);

    /// Resolve on the next render tick.
    fn settle(&self) -> LocalBoxFuture<'_, ()>;

    /// Rectangles of a target, one per fragment.
    fn measure(&self, target: MeasureTarget<'_>) -> Vec<Rect>;

    /// Size the scroll/column container along the reading axis.
    fn set_container_extent(&self, extent: f64);

    /// Pin a tracking section's extents so later layouts skip measuring it.
    fn freeze_extent(&self, id: &TrackingId, inline_extent: f64, block_extent: f64);

    /// Scroll to a stored (physical, signed) offset.
    fn scroll_to(&self, offset: f64);

    /// Current stored (physical, signed) offset.
    fn scroll_offset(&self) -> f64;

    /// Remove all content (empty display).
    fn clear(&self);
}
