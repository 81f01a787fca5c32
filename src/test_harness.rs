//! Scenario test harness
//!
//! Wires a [`NavigationController`] to the simulated host so scenario tests
//! read as sequences of reader actions followed by assertions on events,
//! positions and surface counters.

use std::rc::Rc;

use crate::bake::MemoryGeometryStore;
use crate::config::EngineConfig;
use crate::events::RecordingSink;
use crate::model::{Flow, PagerEvent, RelocateEvent, Viewport};
use crate::navigation::{NavOutcome, NavTarget, NavigationController};
use crate::simulated::{SimDocument, SimSectionStore, SimulatedSurface};
use crate::surface::LayoutDirectives;

/// Viewport used unless a test picks another: one 1000-long block fills a page.
pub const PAGE: f64 = 1000.0;

/// Navigation controller over simulated collaborators.
pub struct PagerHarness {
    pub store: Rc<SimSectionStore>,
    pub surface: Rc<SimulatedSurface>,
    pub sink: Rc<RecordingSink>,
    pub geometry: Rc<MemoryGeometryStore>,
    pub nav: NavigationController,
}

impl PagerHarness {
    /// Paginated harness with a square `PAGE` viewport.
    pub fn new(document: SimDocument) -> Self {
        Self::with_flow(document, Flow::Paginated)
    }

    /// Harness with a flow and the default viewport.
    pub fn with_flow(document: SimDocument, flow: Flow) -> Self {
        Self::build(
            document,
            LayoutDirectives::new(flow, Viewport::new(PAGE, PAGE)),
            EngineConfig::default(),
            Rc::new(MemoryGeometryStore::new()),
        )
    }

    /// Harness sharing an existing geometry store (reopen scenarios).
    pub fn with_geometry(document: SimDocument, geometry: Rc<MemoryGeometryStore>) -> Self {
        Self::build(
            document,
            LayoutDirectives::new(Flow::Paginated, Viewport::new(PAGE, PAGE)),
            EngineConfig::default(),
            geometry,
        )
    }

    /// Fully specified harness.
    pub fn build(
        document: SimDocument,
        directives: LayoutDirectives,
        config: EngineConfig,
        geometry: Rc<MemoryGeometryStore>,
    ) -> Self {
        let store = Rc::new(SimSectionStore::new(document));
        let surface = Rc::new(SimulatedSurface::new());
        let sink = Rc::new(RecordingSink::new());
        let nav = NavigationController::new(
            store.clone(),
            surface.clone(),
            sink.clone(),
            directives,
            config,
        )
        .with_geometry_store(geometry.clone());

        Self {
            store,
            surface,
            sink,
            geometry,
            nav,
        }
    }

    /// Navigate to the start of a section, expecting success.
    pub async fn open(&self, index: usize) -> NavOutcome {
        self.nav
            .go_to(NavTarget::section(index))
            .await
            .expect("navigation failed")
    }

    /// Turn forward, expecting success.
    pub async fn next(&self) -> NavOutcome {
        self.nav.next().await.expect("page turn failed")
    }

    /// Turn backward, expecting success.
    pub async fn prev(&self) -> NavOutcome {
        self.nav.prev().await.expect("page turn failed")
    }

    /// `(section, page)` of the displayed position.
    pub fn position(&self) -> (usize, usize) {
        let page = self.nav.view().map_or(0, |view| view.page_index());
        (self.nav.current_index().get(), page)
    }

    /// Emitted events, draining the sink.
    pub fn drain(&self) -> Vec<PagerEvent> {
        self.sink.take()
    }

    /// Most recent relocate.
    pub fn last_relocate(&self) -> RelocateEvent {
        self.sink.last_relocate().expect("no relocate emitted")
    }
}
