//! Navigation lock with a watchdog.
//!
//! At most one navigation runs at a time. A second request made while the
//! lock is held is rejected, unless the holder has kept it longer than the
//! timeout: then the watchdog logs a [`NavigationTimeoutError`] and hands the
//! lock to the newcomer. A guard only releases the lock it still owns, so a
//! navigation that lost its lock to the watchdog cannot release its
//! successor's.

use std::cell::Cell;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::model::NavigationTimeoutError;

#[derive(Debug, Clone, Copy)]
struct Holder {
    token: u64,
    acquired: Instant,
}

/// Single-holder lock stamped with its acquisition time.
#[derive(Debug)]
pub struct NavLock {
    holder: Cell<Option<Holder>>,
    next_token: Cell<u64>,
    timeout: Duration,
}

impl NavLock {
    /// Create an unheld lock.
    pub fn new(timeout: Duration) -> Self {
        Self {
            holder: Cell::new(None),
            next_token: Cell::new(0),
            timeout,
        }
    }

    /// Watchdog timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the lock is held (expired or not).
    pub fn is_held(&self) -> bool {
        self.holder.get().is_some()
    }

    /// How long the current holder has held the lock.
    pub fn held_for(&self) -> Option<Duration> {
        self.holder.get().map(|h| h.acquired.elapsed())
    }

    /// Take the lock, force-releasing an expired holder.
    ///
    /// Returns `None` while a non-expired holder exists.
    pub fn try_acquire(&self) -> Option<NavGuard<'_>> {
        if let Some(holder) = self.holder.get() {
            let held = holder.acquired.elapsed();
            if held < self.timeout {
                return None;
            }
            let timeout = NavigationTimeoutError {
                held_ms: held.as_millis() as u64,
                timeout_ms: self.timeout.as_millis() as u64,
            };
            warn!(error = %timeout, token = holder.token, "Navigation watchdog fired");
        }

        let token = self.next_token.get() + 1;
        self.next_token.set(token);
        self.holder.set(Some(Holder {
            token,
            acquired: Instant::now(),
        }));
        Some(NavGuard { lock: self, token })
    }
}

/// Holds the [`NavLock`] until dropped.
#[derive(Debug)]
pub struct NavGuard<'a> {
    lock: &'a NavLock,
    token: u64,
}

impl NavGuard<'_> {
    /// Whether this guard still owns the lock.
    pub fn is_owner(&self) -> bool {
        self.lock
            .holder
            .get()
            .is_some_and(|holder| holder.token == self.token)
    }
}

impl Drop for NavGuard<'_> {
    fn drop(&mut self) {
        if self.is_owner() {
            self.lock.holder.set(None);
        }
    }
}
