//! Internal test modules - whitebox tests with crate access
//!
//! Scenario tests drive a [`crate::test_harness::PagerHarness`] through
//! reader actions and assert on emitted events, positions and the simulated
//! surface's counters.


// Property tests with internal access
mod reading_properties;
