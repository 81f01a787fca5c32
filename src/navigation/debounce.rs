//! Trailing debounce for resize and scroll notifications

use std::cell::Cell;
use std::time::Duration;

/// Trailing-edge debouncer.
///
/// Every call to [`Debouncer::settle`] waits out the delay; only the most
/// recent call returns `true`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Cell<u64>,
}

impl Debouncer {
    /// Create a debouncer with a fixed delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Cell::new(0),
        }
    }

    /// Wait out the delay; `false` when a later call superseded this one.
    pub async fn settle(&self) -> bool {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        tokio::time::sleep(self.delay).await;
        self.generation.get() == generation
    }
}
