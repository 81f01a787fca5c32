//! Integration tests: baked geometry through the JSON file store
//!
//! Tests validate:
//! 1. Bake → persist → reopen reproduces the page count with zero
//!    per-element measurements
//! 2. Concurrent bake requests run at most two passes
//! 3. A bake for a view that is no longer active is discarded

use std::path::PathBuf;
use std::rc::Rc;

use reflow_pager::bake::{
    Applied, BakeOutcome, BakeReason, BakeRequest, GeometryStore, JsonFileGeometryStore,
    MemoryGeometryStore, TicketBoard,
};
use reflow_pager::config::EngineConfig;
use reflow_pager::layout::{LayoutView, RenderOptions};
use reflow_pager::model::{Flow, SectionIndex, Viewport};
use reflow_pager::simulated::{SimBlock, SimSection, SimulatedSurface};
use reflow_pager::surface::LayoutDirectives;

fn chapter() -> SimSection {
    SimSection::new("ch07.xhtml")
        .with_block(SimBlock::new("intro", 700.0).with_sentinels(7).with_marker())
        .with_block(SimBlock::new("body", 2100.0).with_sentinels(21))
        .with_block(SimBlock::new("outro", 450.0).with_sentinels(4))
}

fn directives() -> LayoutDirectives {
    LayoutDirectives::new(Flow::Paginated, Viewport::new(1000.0, 1000.0))
        .with_fingerprint("serif-16")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reflow_pager_roundtrip_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Load and render `chapter()` on a fresh surface through `store`.
async fn open_view(store: Rc<dyn GeometryStore>) -> (LayoutView, Rc<SimulatedSurface>) {
    let surface = Rc::new(SimulatedSurface::new());
    let content = Rc::new(chapter().to_content(SectionIndex::new(6)));
    let view = LayoutView::new(content, surface.clone(), EngineConfig::default())
        .with_store(store, "roundtrip-book");
    view.load().await.expect("chapter should load");
    view.render(directives(), RenderOptions::default()).await;
    view.wait_ready().await;
    (view, surface)
}

#[tokio::test]
async fn reopen_from_json_store_measures_nothing() {
    let dir = scratch_dir("reopen");
    let store: Rc<dyn GeometryStore> = Rc::new(JsonFileGeometryStore::new(&dir));

    // GIVEN: A first view baked and persisted its geometry
    let (first, first_surface) = open_view(store.clone()).await;
    assert!(first_surface.element_measurements() > 0);
    let files = std::fs::read_dir(&dir).expect("cache dir").count();
    assert_eq!(files, 1, "One file per cache key");

    // WHEN: The same section is opened again on a fresh surface
    let (second, second_surface) = open_view(store.clone()).await;

    // THEN: Stored geometry applies without measuring any element
    assert_eq!(second_surface.element_measurements(), 0);
    assert_eq!(second.page_count(), first.page_count());
    assert_eq!(second.page_count(), Some(4));

    let outcome = second.bake(BakeRequest::new(BakeReason::Explicit)).await;
    match outcome {
        Some(BakeOutcome::Completed(report)) => {
            assert_eq!(report.applied, Applied::All);
            assert_eq!(report.measured, 0);
            assert!(!report.persisted);
        }
        other => panic!("expected a completed pass, got {other:?}"),
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn concurrent_bake_requests_run_at_most_two_passes() {
    let (view, _surface) = open_view(Rc::new(MemoryGeometryStore::new())).await;
    let cache = view.cache().expect("loaded view has a cache");
    let before = cache.passes();

    let (a, b, c) = futures::join!(
        view.bake(BakeRequest::new(BakeReason::Relayout)),
        view.bake(BakeRequest::new(BakeReason::Relayout)),
        view.bake(BakeRequest::new(BakeReason::Explicit)),
    );

    assert!(cache.passes() - before <= 2);
    let coalesced = [a, b, c]
        .into_iter()
        .filter(|o| *o == Some(BakeOutcome::Coalesced))
        .count();
    assert_eq!(coalesced, 2);
    assert!(cache.is_ready());
}

#[tokio::test]
async fn inactive_view_bake_is_discarded() {
    let store = Rc::new(MemoryGeometryStore::new());
    let board = TicketBoard::new();
    let surface = Rc::new(SimulatedSurface::new());
    let content = Rc::new(chapter().to_content(SectionIndex::new(6)));

    // GIVEN: A view whose ticket was never made active
    let view = LayoutView::new(content, surface.clone(), EngineConfig::default())
        .with_board(board.clone())
        .with_store(store.clone(), "roundtrip-book");
    view.load().await.unwrap();

    // WHEN: It renders and bakes
    let geometry = view.render(directives(), RenderOptions::default()).await;
    let outcome = view.bake(BakeRequest::new(BakeReason::Explicit)).await;

    // THEN: Geometry commits but nothing is frozen or persisted
    assert_eq!(geometry.map(|g| g.page_count), Some(4));
    assert_eq!(outcome, Some(BakeOutcome::Discarded));
    assert_eq!(surface.freezes(), 0);
    assert!(store.is_empty());
}
