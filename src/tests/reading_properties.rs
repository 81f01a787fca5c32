//! Property-based tests for reading order.
//!
//! Property Under Test:
//! "Paging through a document shows every page of every linear section
//! exactly once, in order, and paging back retraces the same positions"
//!
//! Documents are generated with arbitrary block extents so page counts
//! vary per section, including sections shorter than one page.

use std::future::Future;

use proptest::prelude::*;

use crate::layout::page_count;
use crate::navigation::NavOutcome;
use crate::simulated::{SimBlock, SimDocument, SimSection};
use crate::test_harness::{PagerHarness, PAGE};

// ===== Arbitrary Strategies =====

fn arb_section(index: usize) -> impl Strategy<Value = SimSection> {
    prop::collection::vec((100.0..2500.0f64, 0usize..6), 1..4).prop_map(move |blocks| {
        blocks.into_iter().enumerate().fold(
            SimSection::new(format!("s{index}.xhtml")),
            |section, (b, (extent, sentinels))| {
                let block = SimBlock::new(format!("b{b}"), extent).with_sentinels(sentinels);
                section.with_block(block)
            },
        )
    })
}

fn arb_document() -> impl Strategy<Value = SimDocument> {
    (1usize..5)
        .prop_flat_map(|count| (0..count).map(arb_section).collect::<Vec<_>>())
        .prop_map(|sections| SimDocument {
            key: "generated".to_string(),
            sections,
        })
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
        .block_on(future)
}

async fn walk(harness: &PagerHarness, forward: bool) -> Vec<(usize, usize)> {
    let mut visited = vec![harness.position()];
    loop {
        let outcome = if forward {
            harness.next().await
        } else {
            harness.prev().await
        };
        if outcome == NavOutcome::Unchanged {
            return visited;
        }
        visited.push(harness.position());
    }
}

// ===== Properties =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn forward_reading_visits_each_page_once(document in arb_document()) {
        let expected: Vec<(usize, usize)> = document
            .sections
            .iter()
            .enumerate()
            .flat_map(|(s, section)| {
                (0..page_count(section.total_extent(), PAGE)).map(move |p| (s, p))
            })
            .collect();

        let visited = block_on(async {
            let harness = PagerHarness::new(document);
            harness.open(0).await;
            walk(&harness, true).await
        });

        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn backward_reading_retraces_forward_reading(document in arb_document()) {
        let (forward, backward) = block_on(async {
            let harness = PagerHarness::new(document);
            harness.open(0).await;
            let forward = walk(&harness, true).await;
            let backward = walk(&harness, false).await;
            (forward, backward)
        });

        let mut retraced = backward;
        retraced.reverse();
        prop_assert_eq!(retraced, forward);
    }

    #[test]
    fn relocates_stay_within_section_bounds(document in arb_document()) {
        let relocates = block_on(async {
            let harness = PagerHarness::new(document);
            harness.open(0).await;
            walk(&harness, true).await;
            harness.sink.relocates()
        });

        for relocate in relocates {
            let count = relocate.page_count.unwrap_or(1);
            prop_assert!(relocate.page_number.unwrap_or(0) < count);
            prop_assert!((0.0..=1.0).contains(&relocate.fraction));
            if let Some(range) = relocate.range {
                prop_assert!(range.start <= range.end);
            }
        }
    }
}
