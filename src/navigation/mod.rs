//! Page-turn and section-turn state machine.
//!
//! The [`NavigationController`] owns the displayed [`LayoutView`], the
//! navigation lock, the restore anchor and the neighbor prefetch cache.
//!
//! # Navigation lifecycle
//!
//! ```text
//! go_to ──lock──▶ goTo event ──▶ load (prefetch or store) ──▶ LayoutView::load
//!                                                              │
//!   didDisplay ◀── relocate ◀── wait ready ◀── scroll ◀── render + bake
//! ```
//!
//! Every accepted call holds a [`NavGuard`] for its whole duration. A
//! navigation that loses its lock to the watchdog notices at its next
//! suspension point and abandons without touching the display.
//!
//! Directives handed to [`NavigationController::relayout`] while the lock is
//! held are recorded immediately; the holder re-renders its view with them
//! before it reports a position.

pub mod debounce;
pub mod lock;
pub mod prefetch;

pub use debounce::Debouncer;
pub use lock::{NavGuard, NavLock};
pub use prefetch::{shared_load, LoadResult, Prefetcher, SharedLoad};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, info, instrument, warn};

use crate::bake::{GeometryStore, TicketBoard};
use crate::config::EngineConfig;
use crate::events::EventSink;
use crate::layout::{LayoutView, RenderOptions, StepOutcome, TurnDirection};
use crate::model::{
    Anchor, NavigationError, PagerEvent, RelocateEvent, RelocateReason, SectionContent,
    SectionIndex, SectionStatus,
};
use crate::sentinel::ContentRange;
use crate::source::SectionStore;
use crate::surface::{LayoutDirectives, RenderSurface};

/// Where to navigate.
#[derive(Debug, Clone, PartialEq)]
pub struct NavTarget {
    /// Target section.
    pub index: usize,
    /// Position inside the section; `None` keeps the start (or, for the
    /// current section, the current position).
    pub anchor: Option<Anchor>,
    /// Reason reported in the resulting relocate.
    pub reason: RelocateReason,
}

impl NavTarget {
    /// Navigate to the start of a section.
    pub fn section(index: usize) -> Self {
        Self {
            index,
            anchor: None,
            reason: RelocateReason::Navigation,
        }
    }

    /// Set the anchor.
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Set the relocate reason.
    pub fn with_reason(mut self, reason: RelocateReason) -> Self {
        self.reason = reason;
        self
    }
}

/// Result of an accepted or rejected navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// A section was loaded and displayed.
    Displayed,
    /// The displayed section moved to a new position.
    Relocated,
    /// Another navigation holds the lock, or this one lost it to the watchdog.
    ///
    /// A rejected relayout still records its directives for the lock holder.
    Rejected,
    /// The store could not supply the section; the display is empty.
    Blank,
    /// Nothing to do (edge of the document, superseded debounce, nothing displayed).
    Unchanged,
}

/// Navigation state machine over a section store and a render surface.
pub struct NavigationController {
    store: Rc<dyn SectionStore>,
    surface: Rc<dyn RenderSurface>,
    geometry_store: Option<Rc<dyn GeometryStore>>,
    sink: Rc<dyn EventSink>,
    config: EngineConfig,
    directives: RefCell<LayoutDirectives>,
    board: TicketBoard,
    lock: NavLock,
    view: RefCell<Option<Rc<LayoutView>>>,
    current: Cell<SectionIndex>,
    anchor: RefCell<Anchor>,
    status: RefCell<Vec<SectionStatus>>,
    prefetch: Prefetcher,
    resize: Debouncer,
    scroll: Debouncer,
    pending_directives: RefCell<Option<LayoutDirectives>>,
}

impl std::fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationController")
            .field("current", &self.current.get())
            .field("anchor", &self.anchor.borrow())
            .field("locked", &self.lock.is_held())
            .field("prefetch", &self.prefetch)
            .finish()
    }
}

impl NavigationController {
    /// Create a controller; nothing is displayed until the first navigation.
    pub fn new(
        store: Rc<dyn SectionStore>,
        surface: Rc<dyn RenderSurface>,
        sink: Rc<dyn EventSink>,
        directives: LayoutDirectives,
        config: EngineConfig,
    ) -> Self {
        let section_count = store.section_count();
        Self {
            prefetch: Prefetcher::new(store.clone()),
            store,
            surface,
            geometry_store: None,
            sink,
            directives: RefCell::new(directives),
            board: TicketBoard::new(),
            lock: NavLock::new(config.lock_timeout),
            view: RefCell::new(None),
            current: Cell::new(SectionIndex::new(0)),
            anchor: RefCell::new(Anchor::start()),
            status: RefCell::new(vec![SectionStatus::Unloaded; section_count]),
            resize: Debouncer::new(config.resize_debounce),
            scroll: Debouncer::new(config.resize_debounce),
            pending_directives: RefCell::new(None),
            config,
        }
    }

    /// Persist baked geometry through a store.
    pub fn with_geometry_store(mut self, store: Rc<dyn GeometryStore>) -> Self {
        self.geometry_store = Some(store);
        self
    }

    /// Current section index.
    pub fn current_index(&self) -> SectionIndex {
        self.current.get()
    }

    /// Displayed view, if any.
    pub fn view(&self) -> Option<Rc<LayoutView>> {
        self.view.borrow().clone()
    }

    /// Position restored after re-layout.
    pub fn anchor(&self) -> Anchor {
        self.anchor.borrow().clone()
    }

    /// Layout state of a section.
    pub fn status(&self, index: usize) -> Option<SectionStatus> {
        self.status.borrow().get(index).copied()
    }

    /// Directives applied to new views.
    pub fn directives(&self) -> LayoutDirectives {
        self.directives.borrow().clone()
    }

    /// Whether a navigation currently holds the lock.
    pub fn is_navigating(&self) -> bool {
        self.lock.is_held()
    }

    /// Sections with a prefetch entry.
    pub fn prefetched(&self) -> Vec<SectionIndex> {
        self.prefetch.indices()
    }

    /// Navigate to a section and position.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` for an index outside the document
    /// and `NavigationError::Content` when the surface rejects the content.
    #[instrument(skip_all, fields(index = target.index, reason = ?target.reason))]
    pub async fn go_to(&self, target: NavTarget) -> Result<NavOutcome, NavigationError> {
        let Some(guard) = self.lock.try_acquire() else {
            debug!("Navigation in progress; rejecting");
            return Ok(NavOutcome::Rejected);
        };
        self.display(&guard, target).await
    }

    /// Turn one page, crossing into the adjacent eligible section at an edge.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Content` when the adjacent section cannot be laid out.
    #[instrument(skip_all, fields(direction = ?direction))]
    pub async fn turn_page(
        &self,
        direction: TurnDirection,
    ) -> Result<NavOutcome, NavigationError> {
        let Some(guard) = self.lock.try_acquire() else {
            debug!("Navigation in progress; rejecting page turn");
            return Ok(NavOutcome::Rejected);
        };

        if let Some(view) = self.view() {
            if view.step(direction) == StepOutcome::Moved {
                self.surface.settle().await;
                if !guard.is_owner() {
                    return Ok(NavOutcome::Rejected);
                }
                if !self.is_current_layout(&view) {
                    self.remember_position(&view).await;
                    if !self.catch_up(&view, &guard).await {
                        return Ok(NavOutcome::Rejected);
                    }
                }
                self.relocate(&view, RelocateReason::Page).await;
                return Ok(NavOutcome::Relocated);
            }
        }

        let Some(index) = self.adjacent(self.current.get(), direction) else {
            debug!("No adjacent section; page turn ignored");
            return Ok(NavOutcome::Unchanged);
        };
        let anchor = match direction {
            TurnDirection::Forward => Anchor::start(),
            TurnDirection::Backward => Anchor::end(),
        };
        let target = NavTarget::section(index.get())
            .with_anchor(anchor)
            .with_reason(RelocateReason::Page);
        self.display(&guard, target).await
    }

    /// Turn forward.
    ///
    /// # Errors
    ///
    /// See [`Self::turn_page`].
    pub async fn next(&self) -> Result<NavOutcome, NavigationError> {
        self.turn_page(TurnDirection::Forward).await
    }

    /// Turn backward.
    ///
    /// # Errors
    ///
    /// See [`Self::turn_page`].
    pub async fn prev(&self) -> Result<NavOutcome, NavigationError> {
        self.turn_page(TurnDirection::Backward).await
    }

    /// Go to the start of the first eligible section.
    ///
    /// # Errors
    ///
    /// See [`Self::go_to`].
    pub async fn first_section(&self) -> Result<NavOutcome, NavigationError> {
        match self.first_eligible() {
            Some(index) => self.go_to(NavTarget::section(index.get())).await,
            None => Ok(NavOutcome::Unchanged),
        }
    }

    /// Go to the start of the last eligible section.
    ///
    /// # Errors
    ///
    /// See [`Self::go_to`].
    pub async fn last_section(&self) -> Result<NavOutcome, NavigationError> {
        match self.last_eligible() {
            Some(index) => self.go_to(NavTarget::section(index.get())).await,
            None => Ok(NavOutcome::Unchanged),
        }
    }

    /// Whether nothing precedes the current position.
    pub fn at_start(&self) -> bool {
        !self.has_prev_section() && self.is_at_section_start()
    }

    /// Whether nothing follows the current position.
    pub fn at_end(&self) -> bool {
        !self.has_next_section() && self.is_at_section_end()
    }

    /// Whether an eligible section precedes the current one.
    pub fn has_prev_section(&self) -> bool {
        self.adjacent(self.current.get(), TurnDirection::Backward)
            .is_some()
    }

    /// Whether an eligible section follows the current one.
    pub fn has_next_section(&self) -> bool {
        self.adjacent(self.current.get(), TurnDirection::Forward)
            .is_some()
    }

    /// Whether the displayed view shows its first page.
    pub fn is_at_section_start(&self) -> bool {
        self.view().is_none_or(|view| view.is_at_start())
    }

    /// Whether the displayed view shows its last page.
    pub fn is_at_section_end(&self) -> bool {
        self.view().is_none_or(|view| view.is_at_end())
    }

    /// Re-render the current view with new directives and restore the anchor.
    ///
    /// The directives are recorded even when another navigation holds the
    /// lock; that navigation lays out with them before it reports.
    #[instrument(skip_all)]
    pub async fn relayout(&self, directives: LayoutDirectives) -> NavOutcome {
        *self.directives.borrow_mut() = directives;
        let Some(guard) = self.lock.try_acquire() else {
            debug!("Navigation in progress; directives left for the lock holder");
            return NavOutcome::Rejected;
        };

        let Some(view) = self.view() else {
            return NavOutcome::Unchanged;
        };
        view.render(self.directives(), RenderOptions::relayout()).await;
        if !guard.is_owner() {
            return NavOutcome::Rejected;
        }
        view.scroll_to_anchor(&self.anchor());
        if !self.catch_up(&view, &guard).await {
            return NavOutcome::Rejected;
        }
        view.wait_ready().await;
        self.relocate(&view, RelocateReason::Resize).await;
        info!(pages = view.page_count().unwrap_or(1), "Relayout complete");
        NavOutcome::Relocated
    }

    /// Debounced resize notification; only the last of a burst relays out.
    pub async fn on_resize(&self, directives: LayoutDirectives) -> NavOutcome {
        *self.pending_directives.borrow_mut() = Some(directives);
        if !self.resize.settle().await {
            return NavOutcome::Unchanged;
        }
        let Some(directives) = self.pending_directives.borrow_mut().take() else {
            return NavOutcome::Unchanged;
        };
        self.relayout(directives).await
    }

    /// Debounced free-scroll notification; reports the new position.
    pub async fn on_scroll(&self) -> NavOutcome {
        if !self.scroll.settle().await {
            return NavOutcome::Unchanged;
        }
        let Some(_guard) = self.lock.try_acquire() else {
            return NavOutcome::Rejected;
        };
        let Some(view) = self.view() else {
            return NavOutcome::Unchanged;
        };
        self.relocate(&view, RelocateReason::Scroll).await;
        NavOutcome::Relocated
    }

    /// Drive pending neighbor loads; call when the host is idle.
    pub async fn prefetch_idle(&self) -> usize {
        self.prefetch.drive_idle().await
    }

    async fn display(
        &self,
        guard: &NavGuard<'_>,
        target: NavTarget,
    ) -> Result<NavOutcome, NavigationError> {
        let count = self.store.section_count();
        if target.index >= count {
            return Err(NavigationError::OutOfRange {
                index: target.index,
                count,
            });
        }
        let index = SectionIndex::new(target.index);

        if let Some(view) = self.view().filter(|_| index == self.current.get()) {
            if let Some(anchor) = &target.anchor {
                view.scroll_to_anchor(anchor);
                *self.anchor.borrow_mut() = anchor.clone();
                self.surface.settle().await;
                if !guard.is_owner() {
                    return Ok(NavOutcome::Rejected);
                }
            }
            self.relocate(&view, target.reason).await;
            return Ok(NavOutcome::Relocated);
        }

        self.sink.emit(PagerEvent::GoTo {
            will_load_new_index: true,
        });
        self.set_status(index, SectionStatus::Loading);

        let load = self
            .prefetch
            .take(index)
            .unwrap_or_else(|| shared_load(self.store.clone(), index));
        let content = match load.await {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, %index, "Section load failed; showing empty display");
                self.set_status(index, SectionStatus::Unloaded);
                if !guard.is_owner() {
                    return Ok(NavOutcome::Rejected);
                }
                self.show_blank(index, target.reason);
                return Ok(NavOutcome::Blank);
            }
        };
        if !guard.is_owner() {
            debug!(%index, "Navigation superseded during load");
            self.abandon(index, None);
            return Ok(NavOutcome::Rejected);
        }

        let mut view = LayoutView::new(content.clone(), self.surface.clone(), self.config)
            .with_board(self.board.clone());
        if let Some(store) = &self.geometry_store {
            view = view.with_store(store.clone(), self.store.document_key());
        }
        let view = Rc::new(view);
        self.board.activate(view.ticket());

        let previous = self.retire_view();
        if let Err(source) = view.load().await {
            warn!(error = %source, %index, "Section content unusable");
            self.set_status(index, SectionStatus::Unusable);
            self.store.unload(index);
            self.board.deactivate();
            self.surface.clear();
            self.current.set(index);
            self.refresh_prefetch(index, previous);
            return Err(NavigationError::Content { index, source });
        }
        self.set_status(index, SectionStatus::Loaded);
        self.sink.emit(PagerEvent::Load {
            index,
            location: content.href.clone(),
        });

        view.render(self.directives(), RenderOptions::default()).await;
        if !guard.is_owner() {
            debug!(%index, "Navigation superseded during render");
            self.abandon(index, previous);
            return Ok(NavOutcome::Rejected);
        }

        let anchor = target.anchor.unwrap_or_default();
        view.scroll_to_anchor(&anchor);
        *self.anchor.borrow_mut() = anchor;
        *self.view.borrow_mut() = Some(view.clone());
        self.current.set(index);
        self.refresh_prefetch(index, previous);

        view.wait_ready().await;
        if !self.catch_up(&view, guard).await {
            return Ok(NavOutcome::Rejected);
        }
        self.relocate(&view, target.reason).await;
        self.sink.emit(PagerEvent::DidDisplay);
        info!(%index, pages = view.page_count().unwrap_or(1), "Section displayed");
        Ok(NavOutcome::Displayed)
    }

    /// Detach the displayed view and drop its observations, returning what it showed.
    ///
    /// Callers may still hold the view; it no longer owns the surface.
    fn retire_view(&self) -> Option<(SectionIndex, Rc<SectionContent>)> {
        let view = self.view.borrow_mut().take()?;
        view.release_observers();
        Some((view.index(), view.content().clone()))
    }

    fn is_current_layout(&self, view: &LayoutView) -> bool {
        view.directives().as_ref() == Some(&*self.directives.borrow())
    }

    /// Re-render `view` until it uses the latest directives, restoring the anchor.
    ///
    /// Returns `false` when the lock was lost meanwhile.
    async fn catch_up(&self, view: &LayoutView, guard: &NavGuard<'_>) -> bool {
        while !self.is_current_layout(view) {
            debug!(index = %view.index(), "Applying directives recorded during navigation");
            view.render(self.directives(), RenderOptions::relayout()).await;
            if !guard.is_owner() {
                return false;
            }
            view.scroll_to_anchor(&self.anchor());
        }
        true
    }

    /// Release sections touched by a navigation that lost its lock.
    ///
    /// Sections the superseding navigation displays or prefetches stay loaded.
    fn abandon(&self, index: SectionIndex, previous: Option<(SectionIndex, Rc<SectionContent>)>) {
        let displayed = self.view().map(|view| view.index());
        let touched = std::iter::once(index).chain(previous.map(|(left, _)| left));
        for left in touched {
            if Some(left) != displayed && !self.prefetch.contains(left) {
                self.unload(left);
            }
        }
    }

    fn show_blank(&self, index: SectionIndex, reason: RelocateReason) {
        let previous = self.retire_view();
        self.board.deactivate();
        self.surface.clear();
        self.current.set(index);
        *self.anchor.borrow_mut() = Anchor::start();
        self.refresh_prefetch(index, previous);
        self.sink.emit(PagerEvent::Relocate(RelocateEvent {
            reason,
            index,
            fraction: 0.0,
            page_number: None,
            page_count: None,
            range: None,
        }));
    }

    /// Store the visible position of `view` as the restore anchor.
    async fn remember_position(&self, view: &LayoutView) -> ContentRange {
        let range = view.visible_range().await;
        *self.anchor.borrow_mut() = if range.is_collapsed() {
            Anchor::Fraction(view.fraction())
        } else {
            Anchor::Range(range)
        };
        range
    }

    async fn relocate(&self, view: &LayoutView, reason: RelocateReason) {
        let range = self.remember_position(view).await;
        let fraction = view.fraction();
        self.sink.emit(PagerEvent::Relocate(RelocateEvent {
            reason,
            index: view.index(),
            fraction,
            page_number: Some(view.page_index()),
            page_count: Some(view.page_count().unwrap_or(1)),
            range: Some(range),
        }));
    }

    /// Re-target prefetch entries at the neighbors of `index`.
    ///
    /// The section being left stays as a ready entry when it is still a
    /// neighbor; otherwise it is unloaded.
    fn refresh_prefetch(
        &self,
        index: SectionIndex,
        previous: Option<(SectionIndex, Rc<SectionContent>)>,
    ) {
        let neighbors: Vec<SectionIndex> = [TurnDirection::Backward, TurnDirection::Forward]
            .into_iter()
            .filter_map(|direction| self.adjacent(index, direction))
            .collect();

        if let Some((left, content)) = previous.filter(|(left, _)| *left != index) {
            if neighbors.contains(&left) {
                self.prefetch.insert_ready(left, content);
            } else {
                self.unload(left);
            }
        }
        for evicted in self.prefetch.retain(&neighbors) {
            self.unload(evicted);
        }
        for neighbor in neighbors {
            self.prefetch.ensure(neighbor);
        }
    }

    fn unload(&self, index: SectionIndex) {
        self.store.unload(index);
        if self.status(index.get()) != Some(SectionStatus::Unusable) {
            self.set_status(index, SectionStatus::Unloaded);
        }
    }

    fn set_status(&self, index: SectionIndex, status: SectionStatus) {
        if let Some(slot) = self.status.borrow_mut().get_mut(index.get()) {
            *slot = status;
        }
    }

    fn is_eligible(&self, index: usize) -> bool {
        let linear = self
            .store
            .sections()
            .get(index)
            .is_some_and(|info| info.linear.is_linear());
        linear && self.status(index) != Some(SectionStatus::Unusable)
    }

    /// Nearest eligible section in a direction.
    fn adjacent(&self, from: SectionIndex, direction: TurnDirection) -> Option<SectionIndex> {
        let count = self.store.section_count();
        let from = from.get();
        let found = match direction {
            TurnDirection::Forward => (from + 1..count).find(|&i| self.is_eligible(i)),
            TurnDirection::Backward => (0..from.min(count))
                .rev()
                .find(|&i| self.is_eligible(i)),
        };
        found.map(SectionIndex::new)
    }

    fn first_eligible(&self) -> Option<SectionIndex> {
        (0..self.store.section_count())
            .find(|&i| self.is_eligible(i))
            .map(SectionIndex::new)
    }

    fn last_eligible(&self) -> Option<SectionIndex> {
        (0..self.store.section_count())
            .rev()
            .find(|&i| self.is_eligible(i))
            .map(SectionIndex::new)
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
