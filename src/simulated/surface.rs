//! Deterministic render surface
//!
//! Lays blocks end to end along the block axis. In paginated flow the run is
//! cut into columns as long as the viewport's block-axis size, `max_columns`
//! columns to a page; in scrolled flow it is one continuous strip. Everything
//! the paginator observes (measurements, visibility, scroll offsets) is
//! derived from that model and recorded for inspection.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};

use futures::future::LocalBoxFuture;
use tracing::trace;

use super::document::SimSection;
use crate::layout::pagination::ScrollFrame;
use crate::model::{
    ContentError, ContentOutline, Flow, PhysicalAxis, Progression, Rect, SectionContent, Sentinel,
    SentinelId, SentinelKind, TrackingDescriptor, TrackingId, Viewport, WritingMode,
};
use crate::surface::{LayoutDirectives, MeasureTarget, RenderSurface, VisibilityProbe};

/// Sentinel position in block-axis coordinates.
#[derive(Debug, Clone, Copy)]
struct PlacedSentinel {
    sentinel: Sentinel,
    block_offset: f64,
}

#[derive(Debug, Default)]
struct SurfaceState {
    section: Option<SimSection>,
    block_starts: Vec<f64>,
    sentinels: Vec<PlacedSentinel>,
    directives: Option<LayoutDirectives>,
    writing_mode: WritingMode,
    offset: f64,
    container_extent: f64,
    observed: BTreeSet<usize>,
    frozen: HashMap<TrackingId, (f64, f64)>,
    forced: Vec<TrackingId>,
    scripted_extents: VecDeque<f64>,
    scroll_history: Vec<f64>,
}

/// Column geometry of the current layout.
#[derive(Debug, Clone, Copy)]
struct Columns {
    frame: ScrollFrame,
    block_reversed: bool,
    /// Block-axis length of one column (paginated only).
    length: f64,
    /// Reading-axis width of one column (paginated only).
    stride: f64,
    viewport: Viewport,
    flow: Flow,
}

impl Columns {
    fn column_of(&self, block_offset: f64, total: f64) -> usize {
        if self.length <= 0.0 {
            return 0;
        }
        let last = column_count(total, self.length).saturating_sub(1);
        ((block_offset / self.length).floor().max(0.0) as usize).min(last)
    }

    /// Physical interval for a logical interval along the reading axis.
    fn reading_interval(&self, start: f64, end: f64) -> (f64, f64) {
        match self.frame.progression {
            Progression::Forward => (start, end),
            Progression::Reverse => (-end, -start),
        }
    }

    fn block_interval(&self, start: f64, end: f64) -> (f64, f64) {
        if self.block_reversed {
            (-end, -start)
        } else {
            (start, end)
        }
    }

    fn rect(&self, reading: (f64, f64), block: (f64, f64)) -> Rect {
        let (x, y) = match (self.flow, self.frame.axis) {
            (Flow::Scrolled, _) => {
                let cross = (0.0, self.viewport.along(self.frame.axis.cross()));
                if self.frame.axis == PhysicalAxis::X {
                    (reading, cross)
                } else {
                    (cross, reading)
                }
            }
            (Flow::Paginated, PhysicalAxis::X) => (reading, block),
            (Flow::Paginated, PhysicalAxis::Y) => (block, reading),
        };
        Rect::new(x.0, x.1, y.0, y.1)
    }
}

fn column_count(total: f64, length: f64) -> usize {
    if total <= 0.0 || length <= 0.0 {
        0
    } else {
        (total / length).ceil() as usize
    }
}

/// Simulated [`RenderSurface`].
#[derive(Debug, Default)]
pub struct SimulatedSurface {
    state: RefCell<SurfaceState>,
    loads: Cell<usize>,
    layout_passes: Cell<usize>,
    settles: Cell<usize>,
    content_measurements: Cell<usize>,
    element_measurements: Cell<usize>,
    freezes: Cell<usize>,
    clears: Cell<usize>,
    max_observed: Cell<usize>,
}

impl SimulatedSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue content-extent measurements returned before the modelled value.
    pub fn script_content_extents(&self, extents: impl IntoIterator<Item = f64>) {
        self.state.borrow_mut().scripted_extents.extend(extents);
    }

    /// Successful content loads.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }

    /// `apply_layout` calls.
    pub fn layout_passes(&self) -> usize {
        self.layout_passes.get()
    }

    /// Settle ticks awaited.
    pub fn settles(&self) -> usize {
        self.settles.get()
    }

    /// Whole-content measurements.
    pub fn content_measurements(&self) -> usize {
        self.content_measurements.get()
    }

    /// Tracking-section measurements.
    pub fn element_measurements(&self) -> usize {
        self.element_measurements.get()
    }

    /// `freeze_extent` calls.
    pub fn freezes(&self) -> usize {
        self.freezes.get()
    }

    /// `clear` calls.
    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    /// Largest number of sentinels observed at once.
    pub fn max_observed(&self) -> usize {
        self.max_observed.get()
    }

    /// Sentinels observed right now.
    pub fn observed_count(&self) -> usize {
        self.state.borrow().observed.len()
    }

    /// Every stored offset passed to `scroll_to`, in order.
    pub fn scroll_history(&self) -> Vec<f64> {
        self.state.borrow().scroll_history.clone()
    }

    /// Tracking sections forced visible.
    pub fn forced(&self) -> Vec<TrackingId> {
        self.state.borrow().forced.clone()
    }

    /// Last container extent.
    pub fn container_extent(&self) -> f64 {
        self.state.borrow().container_extent
    }

    /// Frozen extents of a tracking section.
    pub fn frozen(&self, id: &TrackingId) -> Option<(f64, f64)> {
        self.state.borrow().frozen.get(id).copied()
    }

    /// Href of the loaded section.
    pub fn loaded_href(&self) -> Option<String> {
        self.state.borrow().section.as_ref().map(|s| s.href.clone())
    }

    fn columns(state: &SurfaceState) -> Option<Columns> {
        let directives = state.directives.as_ref()?;
        let frame = ScrollFrame::new(directives.flow, state.writing_mode);
        let block_axis = state.writing_mode.block_axis();
        let columns = f64::from(directives.max_columns.max(1));
        Some(Columns {
            frame,
            block_reversed: state.writing_mode.is_vertical()
                && state.writing_mode.vertical_reversed,
            length: directives.viewport.along(block_axis),
            stride: frame.page_extent(directives.viewport) / columns,
            viewport: directives.viewport,
            flow: directives.flow,
        })
    }

    fn block_extent(state: &SurfaceState, index: usize) -> f64 {
        state
            .section
            .as_ref()
            .and_then(|s| s.blocks.get(index))
            .map(|b| b.extent.max(0.0))
            .unwrap_or(0.0)
    }

    fn total_block_extent(state: &SurfaceState) -> f64 {
        state
            .section
            .as_ref()
            .map(|s| s.blocks.iter().map(|b| b.extent.max(0.0)).sum())
            .unwrap_or(0.0)
    }

    fn content_extent(state: &SurfaceState, columns: &Columns) -> f64 {
        let total = Self::total_block_extent(state);
        match columns.flow {
            Flow::Scrolled => total,
            Flow::Paginated => column_count(total, columns.length) as f64 * columns.stride,
        }
    }

    /// Fragments of the block-axis run `[start, end)`.
    fn fragments(state: &SurfaceState, columns: &Columns, start: f64, end: f64) -> Vec<Rect> {
        match columns.flow {
            Flow::Scrolled => {
                let reading = columns.reading_interval(start, end);
                vec![columns.rect(reading, (0.0, 0.0))]
            }
            Flow::Paginated => {
                let total = Self::total_block_extent(state);
                let first = columns.column_of(start, total);
                // A run ending exactly on a column boundary stays in the earlier column.
                let last = ((end / columns.length).ceil() as usize)
                    .saturating_sub(1)
                    .clamp(first, columns.column_of(total, total));
                (first..=last)
                    .map(|k| {
                        let column_start = k as f64 * columns.length;
                        let lo = start.max(column_start) - column_start;
                        let hi = end.min(column_start + columns.length) - column_start;
                        let reading = columns.reading_interval(
                            k as f64 * columns.stride,
                            (k + 1) as f64 * columns.stride,
                        );
                        columns.rect(reading, columns.block_interval(lo, hi.max(lo)))
                    })
                    .collect()
            }
        }
    }

    fn sentinel_rect(state: &SurfaceState, columns: &Columns, block_offset: f64) -> Rect {
        match columns.flow {
            Flow::Scrolled => {
                let reading = columns.reading_interval(block_offset, block_offset);
                columns.rect(reading, (0.0, 0.0))
            }
            Flow::Paginated => {
                let total = Self::total_block_extent(state);
                let k = columns.column_of(block_offset, total);
                let within = block_offset - k as f64 * columns.length;
                let start = k as f64 * columns.stride;
                columns.rect(
                    columns.reading_interval(start, start),
                    columns.block_interval(within, within),
                )
            }
        }
    }

    /// Logical reading-axis position of a sentinel.
    fn sentinel_position(state: &SurfaceState, columns: &Columns, block_offset: f64) -> f64 {
        match columns.flow {
            Flow::Scrolled => block_offset,
            Flow::Paginated => {
                let total = Self::total_block_extent(state);
                columns.column_of(block_offset, total) as f64 * columns.stride
            }
        }
    }
}

impl VisibilityProbe for SimulatedSurface {
    fn observe(&self, sentinel: SentinelId) {
        let mut state = self.state.borrow_mut();
        state.observed.insert(sentinel.get());
        let observed = state.observed.len();
        self.max_observed.set(self.max_observed.get().max(observed));
    }

    fn unobserve(&self, sentinel: SentinelId) {
        self.state.borrow_mut().observed.remove(&sentinel.get());
    }

    fn is_visible(&self, sentinel: SentinelId) -> Option<bool> {
        let state = self.state.borrow();
        if !state.observed.contains(&sentinel.get()) {
            return None;
        }
        let placed = state.sentinels.get(sentinel.get())?;
        let Some(columns) = Self::columns(&state) else {
            return Some(false);
        };
        let position = Self::sentinel_position(&state, &columns, placed.block_offset);
        let window_start = columns.frame.to_logical(state.offset);
        let window = columns.frame.page_extent(columns.viewport);
        Some(position >= window_start - 0.5 && position < window_start + window - 0.5)
    }

    fn force_visible(&self, id: &TrackingId) {
        self.state.borrow_mut().forced.push(id.clone());
    }
}

impl RenderSurface for SimulatedSurface {
    fn load<'a>(
        &'a self,
        content: &'a SectionContent,
    ) -> LocalBoxFuture<'a, Result<(), ContentError>> {
        Box::pin(async move {
            if content.body.is_empty() {
                return Err(ContentError::Empty {
                    href: content.href.clone(),
                });
            }
            let section: SimSection = serde_json::from_slice(&content.body).map_err(|e| {
                ContentError::Uninterpretable {
                    href: content.href.clone(),
                    reason: e.to_string(),
                }
            })?;

            tokio::task::yield_now().await;

            let mut block_starts = Vec::with_capacity(section.blocks.len());
            let mut sentinels = Vec::new();
            let mut cursor = 0.0;
            for (owner, block) in section.blocks.iter().enumerate() {
                let extent = block.extent.max(0.0);
                block_starts.push(cursor);
                if block.marker {
                    sentinels.push(PlacedSentinel {
                        sentinel: Sentinel {
                            id: SentinelId::new(sentinels.len()),
                            owner,
                            kind: SentinelKind::Marker,
                        },
                        block_offset: cursor,
                    });
                }
                for j in 0..block.sentinels {
                    sentinels.push(PlacedSentinel {
                        sentinel: Sentinel {
                            id: SentinelId::new(sentinels.len()),
                            owner,
                            kind: SentinelKind::Content,
                        },
                        block_offset: cursor + (j as f64 + 0.5) * extent / block.sentinels as f64,
                    });
                }
                cursor += extent;
            }

            let mut state = self.state.borrow_mut();
            state.writing_mode = section.writing_mode;
            state.section = Some(section);
            state.block_starts = block_starts;
            state.sentinels = sentinels;
            state.offset = 0.0;
            state.observed.clear();
            state.frozen.clear();
            state.forced.clear();
            drop(state);

            self.loads.set(self.loads.get() + 1);
            trace!(href = %content.href, "Simulated surface loaded section");
            Ok(())
        })
    }

    fn detect_direction(&self) -> WritingMode {
        self.state.borrow().writing_mode
    }

    fn outline(&self) -> ContentOutline {
        let state = self.state.borrow();
        let tracking = state
            .section
            .as_ref()
            .map(|s| {
                s.blocks
                    .iter()
                    .map(|b| TrackingDescriptor {
                        id: TrackingId::new(b.id.clone()),
                        axis: b.axis,
                    })
                    .collect()
            })
            .unwrap_or_default();
        ContentOutline {
            tracking,
            sentinels: state.sentinels.iter().map(|p| p.sentinel).collect(),
        }
    }

    fn apply_layout(&self, directives: &LayoutDirectives, writing_mode: WritingMode) {
        let mut state = self.state.borrow_mut();
        state.directives = Some(directives.clone());
        state.writing_mode = writing_mode;
        self.layout_passes.set(self.layout_passes.get() + 1);
    }

    fn settle(&self) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            self.settles.set(self.settles.get() + 1);
            tokio::task::yield_now().await;
        })
    }

    fn measure(&self, target: MeasureTarget<'_>) -> Vec<Rect> {
        let state = self.state.borrow();
        let Some(columns) = Self::columns(&state) else {
            return Vec::new();
        };

        match target {
            MeasureTarget::Content => {
                drop(state);
                self.content_measurements
                    .set(self.content_measurements.get() + 1);
                let mut state = self.state.borrow_mut();
                let extent = match state.scripted_extents.pop_front() {
                    Some(scripted) => scripted,
                    None => Self::content_extent(&state, &columns),
                };
                let cross = columns.viewport.along(columns.frame.axis.cross());
                let reading = columns.reading_interval(0.0, extent);
                let rect = if columns.frame.axis == PhysicalAxis::X {
                    Rect::new(reading.0, reading.1, 0.0, cross)
                } else {
                    Rect::new(0.0, cross, reading.0, reading.1)
                };
                vec![rect]
            }
            MeasureTarget::Tracking(id) => {
                self.element_measurements
                    .set(self.element_measurements.get() + 1);
                let Some(index) = state
                    .section
                    .as_ref()
                    .and_then(|s| s.blocks.iter().position(|b| b.id == id.as_str()))
                else {
                    return Vec::new();
                };
                let start = state.block_starts[index];
                let end = start + Self::block_extent(&state, index);
                Self::fragments(&state, &columns, start, end)
            }
            MeasureTarget::Sentinel(id) => state
                .sentinels
                .get(id.get())
                .map(|p| vec![Self::sentinel_rect(&state, &columns, p.block_offset)])
                .unwrap_or_default(),
        }
    }

    fn set_container_extent(&self, extent: f64) {
        self.state.borrow_mut().container_extent = extent;
    }

    fn freeze_extent(&self, id: &TrackingId, inline_extent: f64, block_extent: f64) {
        self.freezes.set(self.freezes.get() + 1);
        self.state
            .borrow_mut()
            .frozen
            .insert(id.clone(), (inline_extent, block_extent));
    }

    fn scroll_to(&self, offset: f64) {
        let mut state = self.state.borrow_mut();
        state.offset = offset;
        state.scroll_history.push(offset);
    }

    fn scroll_offset(&self) -> f64 {
        self.state.borrow().offset
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
        let mut state = self.state.borrow_mut();
        let history = std::mem::take(&mut state.scroll_history);
        *state = SurfaceState {
            scroll_history: history,
            ..SurfaceState::default()
        };
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
