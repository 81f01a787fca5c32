//! Geometry pre-measurement and caching ("bake").
//!
//! A bake measures every tracking section of a laid-out section once per
//! `(settings, writing mode, viewport, section, document)` combination,
//! freezes the measured extents on the surface so later layouts skip them,
//! and persists the complete entry set through a [`GeometryStore`]. Reopening
//! the same section under the same key applies the stored set without
//! measuring anything.
//!
//! # Coalescing
//!
//! Bakes never overlap. A request arriving while a bake runs is parked in a
//! single slot of the [`BakeScheduler`] (newest wins) and run by the caller
//! that owns the running bake once it completes.
//!
//! # Readiness
//!
//! `ready` is false for the whole duration of a pass. [`GeometryCache::wait_ready`]
//! suspends until it opens again, bounded by the configured timeout. A guard
//! reopens the gate on every exit path, including cancellation.

pub mod key;
pub mod offsets;
pub mod schedule;
pub mod store;
pub mod ticket;

pub use key::{CacheKey, CacheKeyParts};
pub use offsets::BlockOffsetIndex;
pub use schedule::{Admission, BakeScheduler, SchedulerState};
pub use store::{GeometryStore, JsonFileGeometryStore, MemoryGeometryStore};
pub use ticket::{TicketBoard, ViewTicket};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::model::{ContentOutline, Rect, TrackingId, TrackingSection, WritingMode};
use crate::surface::{MeasureTarget, RenderSurface};

/// Why a bake was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BakeReason {
    /// Extent re-measurement after a render.
    Expand,
    /// Viewport or settings change on a displayed view.
    Relayout,
    /// Requested directly by the host.
    Explicit,
}

impl BakeReason {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Relayout => "relayout",
            Self::Explicit => "explicit",
        }
    }
}

impl fmt::Display for BakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for one bake pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeRequest {
    /// Why the bake is needed.
    pub reason: BakeReason,
    /// Region whose owning tracking section the caller wants reported back.
    pub target_rect: Option<Rect>,
}

impl BakeRequest {
    /// Request without a target region.
    pub fn new(reason: BakeReason) -> Self {
        Self {
            reason,
            target_rect: None,
        }
    }

    /// Attach a target region.
    pub fn with_target(mut self, rect: Rect) -> Self {
        self.target_rect = Some(rect);
        self
    }
}

/// How much of a pass came from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Every cacheable section came from the store; nothing cacheable was measured.
    All,
    /// This many sections came from the store; the rest were measured.
    Some(usize),
    /// Nothing came from the store.
    None,
}

/// Summary of a completed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeReport {
    /// Key the pass baked under.
    pub key: CacheKey,
    /// Cacheable entries in the baked set.
    pub entries: usize,
    /// Store contribution.
    pub applied: Applied,
    /// Tracking sections measured on the surface (skip-cache sections included).
    pub measured: usize,
    /// Whether the complete set was written to the store.
    pub persisted: bool,
    /// Tracking section at the block-axis start of the request's target rect.
    pub target: Option<TrackingId>,
}

/// Result of [`GeometryCache::bake`].
#[derive(Debug, Clone, PartialEq)]
pub enum BakeOutcome {
    /// This call ran the pass (and any pass queued behind it).
    Completed(BakeReport),
    /// A bake was running; the request was queued for it.
    Coalesced,
    /// The view was replaced while measuring; nothing was applied or persisted.
    Discarded,
}

/// Collaborators and identity for one bake.
#[derive(Clone, Copy)]
pub struct BakeContext<'a> {
    /// Surface to measure and freeze on.
    pub surface: &'a dyn RenderSurface,
    /// Cache transport; `None` disables persistence.
    pub store: Option<&'a dyn GeometryStore>,
    /// Key components.
    pub key: CacheKeyParts<'a>,
    /// Ticket of the view that owns this cache.
    pub ticket: ViewTicket,
    /// Board holding the controller's active ticket.
    pub board: &'a TicketBoard,
}

/// Tracking-section geometry of one section.
pub struct GeometryCache {
    sections: RefCell<Vec<TrackingSection>>,
    offsets: RefCell<BlockOffsetIndex>,
    by_id: HashMap<TrackingId, usize>,
    writing_mode: WritingMode,
    spacing: f64,
    last_key: RefCell<Option<CacheKey>>,
    scheduler: RefCell<BakeScheduler>,
    ready: watch::Sender<bool>,
    ready_timeout: Duration,
    passes: Cell<usize>,
}

impl fmt::Debug for GeometryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryCache")
            .field("sections", &self.sections.borrow().len())
            .field("ready", &self.is_ready())
            .field("passes", &self.passes.get())
            .finish()
    }
}

/// Reopens the readiness gate and idles the scheduler if a pass is abandoned.
struct PassGuard<'a> {
    cache: &'a GeometryCache,
    armed: bool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.scheduler.borrow_mut().reset();
        }
        self.cache.ready.send_replace(true);
    }
}

impl GeometryCache {
    /// Seed tracking sections from a freshly loaded outline.
    ///
    /// Sections whose own axis contradicts `writing_mode` are skip-cache.
    pub fn new(
        outline: &ContentOutline,
        writing_mode: WritingMode,
        spacing: f64,
        ready_timeout: Duration,
    ) -> Self {
        let sections: Vec<TrackingSection> = outline
            .tracking
            .iter()
            .map(|descriptor| {
                let skip_cache = descriptor
                    .axis
                    .is_some_and(|axis| axis != writing_mode.axis);
                TrackingSection::new(descriptor.id.clone(), skip_cache)
            })
            .collect();
        let by_id = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let (ready, _) = watch::channel(true);

        Self {
            offsets: RefCell::new(BlockOffsetIndex::new(sections.len(), spacing)),
            sections: RefCell::new(sections),
            by_id,
            writing_mode,
            spacing,
            last_key: RefCell::new(None),
            scheduler: RefCell::new(BakeScheduler::new()),
            ready,
            ready_timeout,
            passes: Cell::new(0),
        }
    }

    /// Whether no bake is in progress.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Coalescing state.
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.borrow().state()
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> usize {
        self.passes.get()
    }

    /// Snapshot of all tracking sections.
    pub fn tracking(&self) -> Vec<TrackingSection> {
        self.sections.borrow().clone()
    }

    /// Baked block-axis start of a tracking section.
    pub fn block_start(&self, id: &TrackingId) -> Option<f64> {
        let &index = self.by_id.get(id)?;
        let sections = self.sections.borrow();
        let section = &sections[index];
        section.baked.then_some(section.block_start)
    }

    /// Tracking section covering a block-axis offset, once baked.
    pub fn tracking_at_block_offset(&self, offset: f64) -> Option<TrackingId> {
        let index = self.offsets.borrow().lower_bound(offset)?;
        let sections = self.sections.borrow();
        sections
            .get(index)
            .filter(|s| s.baked)
            .map(|s| s.id.clone())
    }

    /// Wait until no bake is in progress.
    ///
    /// After `ready_timeout` the gate is forced open with a warning.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        if tokio::time::timeout(self.ready_timeout, rx.wait_for(|ready| *ready))
            .await
            .is_err()
        {
            warn!(
                timeout_ms = self.ready_timeout.as_millis() as u64,
                "Bake readiness timed out; forcing ready"
            );
            self.ready.send_replace(true);
        }
    }

    /// Bake tracking-section geometry.
    ///
    /// Returns [`BakeOutcome::Coalesced`] immediately when another bake is
    /// running. Otherwise runs this request and then every request queued
    /// behind it, returning the outcome of the last pass.
    #[instrument(skip_all, fields(section = %ctx.key.section, reason = %request.reason))]
    pub async fn bake(&self, ctx: BakeContext<'_>, request: BakeRequest) -> BakeOutcome {
        let admission = self.scheduler.borrow_mut().admit(request);
        let mut request = match admission {
            Admission::Start(request) => request,
            Admission::Coalesced => {
                debug!("Bake already running; request queued");
                return BakeOutcome::Coalesced;
            }
        };

        let mut guard = PassGuard {
            cache: self,
            armed: true,
        };
        loop {
            self.ready.send_replace(false);
            let outcome = self.run_pass(&ctx, &request).await;
            self.ready.send_replace(true);

            let next = self.scheduler.borrow_mut().finish();
            match next {
                Some(queued) => {
                    debug!(reason = %queued.reason, "Running queued bake");
                    request = queued;
                }
                None => {
                    guard.armed = false;
                    return outcome;
                }
            }
        }
    }

    async fn run_pass(&self, ctx: &BakeContext<'_>, request: &BakeRequest) -> BakeOutcome {
        self.passes.set(self.passes.get() + 1);
        let key = CacheKey::compute(&ctx.key);

        let mut staged = self.sections.borrow().clone();
        if self.last_key.borrow().as_ref() != Some(&key) {
            for section in staged.iter_mut() {
                section.baked = false;
            }
        }

        let stored = match ctx.store {
            Some(store) => match store.get(&key).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, %key, "Geometry cache read failed; treating as miss");
                    None
                }
            },
            None => None,
        };

        let cacheable = staged.iter().filter(|s| !s.skip_cache).count();
        let mut from_store = 0;
        if let Some(entries) = stored {
            let by_id: HashMap<&TrackingId, _> = entries.iter().map(|e| (&e.id, e)).collect();
            for section in staged.iter_mut().filter(|s| !s.skip_cache) {
                if let Some(entry) = by_id.get(&section.id) {
                    section.inline_extent = entry.inline_extent;
                    section.block_extent = entry.block_extent;
                    section.baked = true;
                    from_store += 1;
                }
            }
        }
        let applied = if cacheable > 0 && from_store == cacheable {
            Applied::All
        } else if from_store > 0 {
            Applied::Some(from_store)
        } else {
            Applied::None
        };

        let block_axis = self.writing_mode.block_axis();
        let inline_axis = self.writing_mode.inline_axis();
        let mut measured = 0;
        let mut measured_cacheable = 0;
        for section in staged.iter_mut().filter(|s| s.skip_cache || !s.baked) {
            let rects = ctx.surface.measure(MeasureTarget::Tracking(&section.id));
            section.block_extent = rects.iter().map(|r| r.size_along(block_axis)).sum();
            section.inline_extent = rects
                .iter()
                .map(|r| r.size_along(inline_axis))
                .fold(0.0, f64::max);
            section.baked = true;
            measured += 1;
            if !section.skip_cache {
                measured_cacheable += 1;
            }
        }

        let mut offsets = BlockOffsetIndex::new(staged.len(), self.spacing);
        for section in staged.iter() {
            offsets.push(section.block_extent);
        }
        for (i, section) in staged.iter_mut().enumerate() {
            section.block_start = offsets.block_start(i);
        }

        if !ctx.board.is_current(ctx.ticket) {
            debug!(generation = ctx.ticket.generation, "View replaced during bake; discarding");
            return BakeOutcome::Discarded;
        }

        for section in staged.iter() {
            ctx.surface
                .freeze_extent(&section.id, section.inline_extent, section.block_extent);
        }
        let entries: Vec<_> = staged
            .iter()
            .filter(|s| !s.skip_cache)
            .map(TrackingSection::to_entry)
            .collect();
        let entry_count = entries.len();
        let block_total = offsets.total();
        *self.sections.borrow_mut() = staged;
        *self.offsets.borrow_mut() = offsets;
        *self.last_key.borrow_mut() = Some(key.clone());

        let mut persisted = false;
        if let Some(store) = ctx.store {
            if measured_cacheable > 0 {
                match store.set(&key, entries, request.reason).await {
                    Ok(()) => persisted = true,
                    Err(e) => warn!(error = %e, %key, "Geometry cache write failed; skipping"),
                }
            }
        }

        let target = request.target_rect.and_then(|rect| {
            self.tracking_at_block_offset(rect.start_along(block_axis).max(0.0))
        });

        ctx.surface.settle().await;
        debug!(?applied, measured, persisted, block_total, "Bake pass complete");

        BakeOutcome::Completed(BakeReport {
            key,
            entries: entry_count,
            applied,
            measured,
            persisted,
            target,
        })
    }
}

#[cfg(test)]
#[path = "bake_tests.rs"]
mod tests;
