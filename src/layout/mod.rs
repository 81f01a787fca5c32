//! Live layout of one section.
//!
//! A [`LayoutView`] owns the surface-side state of exactly one section:
//! its writing mode, scroll frame, page geometry, baked tracking-section
//! geometry and sentinel tracker. It is created per navigation and dropped
//! when the section is left.
//!
//! Geometry is only committed after the surface settles. A measurement that
//! is not a positive finite extent is retried on the next settle tick, a
//! bounded number of times, and the page count never drops below one.

pub mod pagination;

pub use pagination::{page_count, PageGeometry, ScrollFrame};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::bake::{
    BakeContext, BakeOutcome, BakeReason, BakeRequest, CacheKeyParts, GeometryCache,
    GeometryStore, TicketBoard, ViewTicket,
};
use crate::config::EngineConfig;
use crate::model::{
    Anchor, ContentError, ContentOutline, Flow, InvalidMeasurement, Rect, SectionContent,
    SectionIndex, TrackingId, WritingMode,
};
use crate::sentinel::{ContentRange, SentinelTracker};
use crate::surface::{LayoutDirectives, MeasureTarget, RenderSurface};

/// Offsets closer than this to an edge count as being on it.
const EDGE_TOLERANCE: f64 = 0.5;

/// Options for [`LayoutView::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Apply directives without re-measuring extents or baking.
    pub skip_expand: bool,
    /// Reason recorded with the bake that follows the expand.
    pub bake_reason: BakeReason,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            skip_expand: false,
            bake_reason: BakeReason::Expand,
        }
    }
}

impl RenderOptions {
    /// Options for re-rendering a displayed view after a viewport or settings change.
    pub fn relayout() -> Self {
        Self {
            bake_reason: BakeReason::Relayout,
            ..Self::default()
        }
    }
}

/// Direction of a page turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnDirection {
    /// Toward the end of the section.
    Forward,
    /// Toward the start of the section.
    Backward,
}

/// Result of an in-section step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The view scrolled.
    Moved,
    /// Already at the section edge in the requested direction.
    Boundary,
}

/// Live layout of one section.
pub struct LayoutView {
    content: Rc<SectionContent>,
    surface: Rc<dyn RenderSurface>,
    store: Option<Rc<dyn GeometryStore>>,
    document_key: String,
    config: EngineConfig,
    board: TicketBoard,
    ticket: ViewTicket,
    writing_mode: Cell<WritingMode>,
    outline: RefCell<ContentOutline>,
    directives: RefCell<Option<LayoutDirectives>>,
    frame: Cell<Option<ScrollFrame>>,
    geometry: watch::Sender<Option<PageGeometry>>,
    cache: RefCell<Option<Rc<GeometryCache>>>,
    tracker: RefCell<Option<SentinelTracker>>,
}

impl std::fmt::Debug for LayoutView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutView")
            .field("index", &self.content.index)
            .field("href", &self.content.href)
            .field("ticket", &self.ticket)
            .field("geometry", &self.geometry())
            .finish()
    }
}

impl LayoutView {
    /// Create a standalone view; its ticket is active on a private board.
    pub fn new(
        content: Rc<SectionContent>,
        surface: Rc<dyn RenderSurface>,
        config: EngineConfig,
    ) -> Self {
        let board = TicketBoard::new();
        let ticket = board.issue(content.index);
        board.activate(ticket);
        let (geometry, _) = watch::channel(None);

        Self {
            content,
            surface,
            store: None,
            document_key: String::new(),
            config,
            board,
            ticket,
            writing_mode: Cell::new(WritingMode::default()),
            outline: RefCell::new(ContentOutline::default()),
            directives: RefCell::new(None),
            frame: Cell::new(None),
            geometry,
            cache: RefCell::new(None),
            tracker: RefCell::new(None),
        }
    }

    /// Bake through a geometry store under a document key.
    pub fn with_store(
        mut self,
        store: Rc<dyn GeometryStore>,
        document_key: impl Into<String>,
    ) -> Self {
        self.store = Some(store);
        self.document_key = document_key.into();
        self
    }

    /// Take a ticket from a shared board instead; the owner decides when it is active.
    pub fn with_board(mut self, board: TicketBoard) -> Self {
        self.ticket = board.issue(self.content.index);
        self.board = board;
        self
    }

    /// Section shown by this view.
    pub fn index(&self) -> SectionIndex {
        self.content.index
    }

    /// Content handle.
    pub fn content(&self) -> &Rc<SectionContent> {
        &self.content
    }

    /// Ticket identifying this view instance.
    pub fn ticket(&self) -> ViewTicket {
        self.ticket
    }

    /// Writing mode detected at load.
    pub fn writing_mode(&self) -> WritingMode {
        self.writing_mode.get()
    }

    /// Scroll frame of the last render.
    pub fn frame(&self) -> Option<ScrollFrame> {
        self.frame.get()
    }

    /// Directives of the last render.
    pub fn directives(&self) -> Option<LayoutDirectives> {
        self.directives.borrow().clone()
    }

    /// Tracking sections and sentinels of the loaded content.
    pub fn outline(&self) -> ContentOutline {
        self.outline.borrow().clone()
    }

    /// Committed page geometry.
    pub fn geometry(&self) -> Option<PageGeometry> {
        *self.geometry.borrow()
    }

    /// Listen for geometry commits.
    pub fn subscribe(&self) -> watch::Receiver<Option<PageGeometry>> {
        self.geometry.subscribe()
    }

    /// Baked geometry of this view, once loaded.
    pub fn cache(&self) -> Option<Rc<GeometryCache>> {
        self.cache.borrow().clone()
    }

    /// Lay out the content on the surface.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` when the surface cannot interpret the content.
    #[instrument(skip_all, fields(index = %self.content.index, href = %self.content.href))]
    pub async fn load(&self) -> Result<WritingMode, ContentError> {
        self.surface.load(&self.content).await?;

        let writing_mode = self.surface.detect_direction();
        let outline = self.surface.outline();
        self.writing_mode.set(writing_mode);

        *self.cache.borrow_mut() = Some(Rc::new(GeometryCache::new(
            &outline,
            writing_mode,
            self.config.tracking_spacing,
            self.config.ready_timeout,
        )));
        *self.tracker.borrow_mut() = Some(SentinelTracker::new(
            &outline,
            self.config.sentinel_group_size,
            self.config.max_active_groups,
            self.config.blank_correction_count,
        ));
        debug!(
            tracking = outline.tracking.len(),
            sentinels = outline.sentinels.len(),
            vertical = writing_mode.is_vertical(),
            rtl = writing_mode.is_rtl(),
            "Section laid out"
        );
        *self.outline.borrow_mut() = outline;
        Ok(writing_mode)
    }

    /// Apply layout directives and, unless skipped, re-measure extents.
    pub async fn render(
        &self,
        directives: LayoutDirectives,
        options: RenderOptions,
    ) -> Option<PageGeometry> {
        let writing_mode = self.writing_mode.get();
        self.surface.apply_layout(&directives, writing_mode);
        self.frame
            .set(Some(ScrollFrame::new(directives.flow, writing_mode)));
        *self.directives.borrow_mut() = Some(directives);

        if options.skip_expand {
            return self.geometry();
        }
        self.expand_for(options.bake_reason).await
    }

    /// Re-measure the content extent, commit page geometry and bake.
    ///
    /// Returns `None` when nothing was rendered yet or the viewport has no
    /// extent along the scroll axis.
    pub async fn expand(&self) -> Option<PageGeometry> {
        self.expand_for(BakeReason::Expand).await
    }

    #[instrument(skip_all, fields(index = %self.content.index, %reason))]
    async fn expand_for(&self, reason: BakeReason) -> Option<PageGeometry> {
        let frame = self.frame.get()?;
        let viewport = self.directives.borrow().as_ref()?.viewport;
        let page_extent = frame.page_extent(viewport);

        let mut retries = 0;
        let total = loop {
            self.surface.settle().await;
            let extent = self.measure_content(frame);
            match validate_extent(extent) {
                Ok(extent) => break extent,
                Err(invalid) if retries < self.config.measure_retries => {
                    retries += 1;
                    debug!(%invalid, retries, "Retrying extent measurement after settle");
                }
                Err(invalid) => {
                    warn!(%invalid, retries, "Accepting invalid extent after retries");
                    break extent;
                }
            }
        };

        let Some(geometry) = PageGeometry::new(page_extent, total) else {
            warn!(page_extent, "Viewport has no extent along the scroll axis");
            return None;
        };
        self.surface.set_container_extent(geometry.container_extent());
        self.geometry.send_replace(Some(geometry));
        debug!(
            total = geometry.total_extent,
            pages = geometry.page_count,
            "Page geometry committed"
        );

        self.bake(BakeRequest::new(reason)).await;
        Some(geometry)
    }

    /// Bake tracking-section geometry for the current layout.
    ///
    /// Returns `None` before the view was loaded and rendered.
    pub async fn bake(&self, request: BakeRequest) -> Option<BakeOutcome> {
        let cache = self.cache()?;
        let directives = self.directives()?;
        let ctx = BakeContext {
            surface: &*self.surface,
            store: self.store.as_deref(),
            key: CacheKeyParts {
                settings_fingerprint: &directives.settings_fingerprint,
                writing_mode: self.writing_mode.get(),
                viewport: directives.viewport,
                section: self.content.index,
                document_key: &self.document_key,
                href: &self.content.href,
            },
            ticket: self.ticket,
            board: &self.board,
        };
        Some(cache.bake(ctx, request).await)
    }

    /// Wait for any running bake to finish (bounded).
    pub async fn wait_ready(&self) {
        if let Some(cache) = self.cache() {
            cache.wait_ready().await;
        }
    }

    fn measure_content(&self, frame: ScrollFrame) -> f64 {
        let rects = self.surface.measure(MeasureTarget::Content);
        Rect::union(&rects)
            .map(|rect| rect.size_along(frame.axis))
            .unwrap_or(0.0)
    }

    /// Current logical offset along the reading axis.
    pub fn logical_offset(&self) -> f64 {
        match self.frame.get() {
            Some(frame) => frame.to_logical(self.surface.scroll_offset()),
            None => 0.0,
        }
    }

    fn flow(&self) -> Flow {
        self.directives
            .borrow()
            .as_ref()
            .map_or(self.config.flow, |d| d.flow)
    }

    /// Largest logical offset the view can scroll to.
    fn max_offset(&self, geometry: &PageGeometry) -> f64 {
        match self.flow() {
            Flow::Paginated => geometry.page_offset(geometry.last_page()),
            Flow::Scrolled => (geometry.total_extent - geometry.page_extent).max(0.0),
        }
    }

    /// Page under the current offset.
    pub fn page_index(&self) -> usize {
        self.geometry()
            .map_or(0, |geometry| geometry.page_at(self.logical_offset()))
    }

    /// Number of pages, `>= 1` once geometry is committed.
    pub fn page_count(&self) -> Option<usize> {
        self.geometry().map(|geometry| geometry.page_count)
    }

    /// Scroll to the start of a page (clamped).
    pub fn scroll_to_page(&self, page: usize) {
        if let Some(geometry) = self.geometry() {
            self.scroll_to_logical(geometry.page_offset(page));
        }
    }

    /// Scroll to a logical offset; paginated flow snaps to the containing page.
    pub fn scroll_to_logical(&self, offset: f64) {
        let (Some(frame), Some(geometry)) = (self.frame.get(), self.geometry()) else {
            return;
        };
        let offset = if offset.is_finite() { offset } else { 0.0 };
        let logical = match self.flow() {
            Flow::Paginated => geometry.page_offset(geometry.page_at(offset)),
            Flow::Scrolled => offset.clamp(0.0, self.max_offset(&geometry)),
        };
        self.surface.scroll_to(frame.to_physical(logical));
    }

    /// Move one page within the section.
    pub fn step(&self, direction: TurnDirection) -> StepOutcome {
        let Some(geometry) = self.geometry() else {
            return StepOutcome::Boundary;
        };
        let at_edge = match direction {
            TurnDirection::Forward => self.is_at_end(),
            TurnDirection::Backward => self.is_at_start(),
        };
        if at_edge {
            return StepOutcome::Boundary;
        }

        match self.flow() {
            Flow::Paginated => {
                let page = self.page_index();
                let target = match direction {
                    TurnDirection::Forward => page + 1,
                    TurnDirection::Backward => page.saturating_sub(1),
                };
                self.scroll_to_page(target);
            }
            Flow::Scrolled => {
                let delta = match direction {
                    TurnDirection::Forward => geometry.page_extent,
                    TurnDirection::Backward => -geometry.page_extent,
                };
                self.scroll_to_logical(self.logical_offset() + delta);
            }
        }
        StepOutcome::Moved
    }

    /// Whether the view shows the first page.
    pub fn is_at_start(&self) -> bool {
        match self.flow() {
            Flow::Paginated => self.page_index() == 0,
            Flow::Scrolled => self.logical_offset() <= EDGE_TOLERANCE,
        }
    }

    /// Whether the view shows the last page.
    pub fn is_at_end(&self) -> bool {
        let Some(geometry) = self.geometry() else {
            return true;
        };
        match self.flow() {
            Flow::Paginated => self.page_index() == geometry.last_page(),
            Flow::Scrolled => self.logical_offset() >= self.max_offset(&geometry) - EDGE_TOLERANCE,
        }
    }

    /// Progress through the section in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        let Some(geometry) = self.geometry() else {
            return 0.0;
        };
        match self.flow() {
            Flow::Paginated => geometry.fraction_of_page(self.page_index()),
            Flow::Scrolled if geometry.total_extent > 0.0 => {
                (self.logical_offset() / geometry.total_extent).clamp(0.0, 1.0)
            }
            Flow::Scrolled => 0.0,
        }
    }

    /// Logical offset an anchor points at.
    pub fn resolve_anchor(&self, anchor: &Anchor) -> f64 {
        let (Some(frame), Some(geometry)) = (self.frame.get(), self.geometry()) else {
            return 0.0;
        };
        match anchor {
            Anchor::Fraction(fraction) => {
                let fraction = if fraction.is_finite() {
                    fraction.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                match self.flow() {
                    Flow::Paginated => geometry.page_offset(geometry.page_for_fraction(fraction)),
                    Flow::Scrolled => {
                        (fraction * geometry.total_extent).min(self.max_offset(&geometry))
                    }
                }
            }
            Anchor::Range(range) => self.range_offset(frame, *range),
            Anchor::Element(id) => self.element_offset(frame, id),
            Anchor::Resolver(_) => {
                let resolved = anchor.resolve_with(&self.content, &self.outline.borrow());
                self.resolve_anchor(&resolved)
            }
        }
    }

    /// Resolve an anchor and scroll to it.
    pub fn scroll_to_anchor(&self, anchor: &Anchor) {
        let offset = self.resolve_anchor(anchor);
        self.scroll_to_logical(offset);
    }

    fn range_offset(&self, frame: ScrollFrame, range: ContentRange) -> f64 {
        let Some(first) = range.first() else {
            return 0.0;
        };
        self.logical_start(frame, MeasureTarget::Sentinel(first))
            .unwrap_or(0.0)
    }

    fn element_offset(&self, frame: ScrollFrame, id: &TrackingId) -> f64 {
        if self.flow() == Flow::Scrolled {
            if let Some(start) = self.cache().and_then(|cache| cache.block_start(id)) {
                return start;
            }
        }
        self.logical_start(frame, MeasureTarget::Tracking(id))
            .unwrap_or(0.0)
    }

    fn logical_start(&self, frame: ScrollFrame, target: MeasureTarget<'_>) -> Option<f64> {
        let rects = self.surface.measure(target);
        rects
            .iter()
            .map(|rect| rect.logical_start(frame.axis, frame.progression))
            .reduce(f64::min)
            .map(|start| start.max(0.0))
    }

    /// Visible content range, once any running bake has finished.
    pub async fn visible_range(&self) -> ContentRange {
        self.wait_ready().await;
        let hint = self.fraction();
        let mut tracker = self.tracker.borrow_mut();
        match tracker.as_mut() {
            Some(tracker) => tracker.visible_range(hint, &*self.surface).range,
            None => ContentRange::collapsed_at_start(),
        }
    }

    /// Stop observing this view's sentinels on the surface.
    pub fn release_observers(&self) {
        if let Some(tracker) = self.tracker.borrow_mut().as_mut() {
            tracker.release(&*self.surface);
        }
    }
}

impl Drop for LayoutView {
    fn drop(&mut self) {
        // Once retired, the surface's observations belong to the active view.
        if !self.board.is_current(self.ticket) {
            return;
        }
        if let Some(tracker) = self.tracker.get_mut().as_mut() {
            tracker.release(&*self.surface);
        }
    }
}

fn validate_extent(extent: f64) -> Result<f64, InvalidMeasurement> {
    if extent.is_finite() && extent > 0.0 {
        Ok(extent)
    } else {
        Err(InvalidMeasurement { extent })
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
