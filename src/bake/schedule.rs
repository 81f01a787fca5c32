//! Bake coalescing state machine
//!
//! `Idle → Running → Running+Queued → Idle`. While a bake runs, at most one
//! further request is remembered; a newer request replaces the queued one.

use super::BakeRequest;

/// Scheduler state, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// No bake in progress.
    #[default]
    Idle,
    /// One bake in progress.
    Running,
    /// One bake in progress and one waiting.
    RunningQueued,
}

/// Decision for an incoming request.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The caller must run this request now.
    Start(BakeRequest),
    /// A bake is running; the request was queued for it to pick up.
    Coalesced,
}

/// Coalesces bake requests into at most one running and one queued pass.
#[derive(Debug, Default)]
pub struct BakeScheduler {
    running: bool,
    queued: Option<BakeRequest>,
}

impl BakeScheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        match (self.running, self.queued.is_some()) {
            (false, _) => SchedulerState::Idle,
            (true, false) => SchedulerState::Running,
            (true, true) => SchedulerState::RunningQueued,
        }
    }

    /// Admit a request: start it when idle, otherwise queue it.
    pub fn admit(&mut self, request: BakeRequest) -> Admission {
        if self.running {
            self.queued = Some(request);
            Admission::Coalesced
        } else {
            self.running = true;
            Admission::Start(request)
        }
    }

    /// Finish the running pass. Returns the queued request, which the caller
    /// must run next; the scheduler stays `Running` in that case.
    pub fn finish(&mut self) -> Option<BakeRequest> {
        let next = self.queued.take();
        self.running = next.is_some();
        next
    }

    /// Drop any queued request and return to idle.
    pub fn reset(&mut self) {
        self.running = false;
        self.queued = None;
    }
}
