//! Visible-range query benchmarks.
//!
//! These benchmarks verify that a visible-range query only touches the groups
//! around the hinted position, so its cost stays flat as sections grow.
//!
//! Run with: cargo bench --bench visible_range_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::Range;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflow_pager::model::{
    ContentOutline, Sentinel, SentinelId, SentinelKind, TrackingDescriptor, TrackingId,
};
use reflow_pager::sentinel::SentinelTracker;
use reflow_pager::surface::VisibilityProbe;

/// Sentinels per tracking section in generated outlines.
const SENTINELS_PER_BLOCK: usize = 40;

/// Probe reporting a fixed window of sentinels as on screen.
struct WindowProbe {
    window: RefCell<Range<usize>>,
    observed: RefCell<BTreeSet<usize>>,
}

impl WindowProbe {
    fn new() -> Self {
        Self {
            window: RefCell::new(0..0),
            observed: RefCell::new(BTreeSet::new()),
        }
    }

    fn show(&self, window: Range<usize>) {
        *self.window.borrow_mut() = window;
    }
}

impl VisibilityProbe for WindowProbe {
    fn observe(&self, sentinel: SentinelId) {
        self.observed.borrow_mut().insert(sentinel.get());
    }

    fn unobserve(&self, sentinel: SentinelId) {
        self.observed.borrow_mut().remove(&sentinel.get());
    }

    fn is_visible(&self, sentinel: SentinelId) -> Option<bool> {
        self.observed
            .borrow()
            .contains(&sentinel.get())
            .then(|| self.window.borrow().contains(&sentinel.get()))
    }

    fn force_visible(&self, _id: &TrackingId) {}
}

fn generate_outline(sentinel_count: usize) -> ContentOutline {
    let blocks = sentinel_count.div_ceil(SENTINELS_PER_BLOCK);
    ContentOutline {
        tracking: (0..blocks)
            .map(|i| TrackingDescriptor {
                id: TrackingId::new(format!("block-{i}")),
                axis: None,
            })
            .collect(),
        sentinels: (0..sentinel_count)
            .map(|i| Sentinel {
                id: SentinelId::new(i),
                owner: i / SENTINELS_PER_BLOCK,
                kind: SentinelKind::Content,
            })
            .collect(),
    }
}

/// One screen of sentinels centred on `fraction` of the section.
fn window_at(sentinel_count: usize, fraction: f64) -> Range<usize> {
    let screen = 60.min(sentinel_count);
    let start = ((sentinel_count as f64 * fraction) as usize).min(sentinel_count - screen);
    start..start + screen
}

/// Benchmark a query at mid-section for growing sentinel counts.
fn benchmark_visible_range_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_range_scaling");

    for sentinel_count in [1_000, 10_000, 100_000] {
        let outline = generate_outline(sentinel_count);
        let probe = WindowProbe::new();
        probe.show(window_at(sentinel_count, 0.5));
        let mut tracker = SentinelTracker::new(&outline, 50, 4, 0);

        group.bench_with_input(
            BenchmarkId::new("query", sentinel_count),
            &sentinel_count,
            |b, _| {
                b.iter(|| {
                    let scan = tracker.visible_range(black_box(0.5), &probe);
                    black_box(scan.range)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark paging through a large section, one screen per query.
fn benchmark_visible_range_paging(c: &mut Criterion) {
    let sentinel_count = 100_000;
    let outline = generate_outline(sentinel_count);
    let probe = WindowProbe::new();
    let mut tracker = SentinelTracker::new(&outline, 50, 4, 0);

    let mut group = c.benchmark_group("visible_range_paging_100k");

    let test_positions = [
        ("start", 0.0),
        ("quarter", 0.25),
        ("middle", 0.5),
        ("three_quarters", 0.75),
        ("end", 1.0),
    ];

    for (name, fraction) in test_positions {
        group.bench_with_input(BenchmarkId::new("position", name), &fraction, |b, &fraction| {
            b.iter(|| {
                probe.show(window_at(sentinel_count, fraction));
                // A stale hint makes the search widen before it settles.
                let hint = (fraction - 0.01).max(0.0);
                black_box(tracker.visible_range(black_box(hint), &probe))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_visible_range_scaling,
    benchmark_visible_range_paging
);
criterion_main!(benches);
