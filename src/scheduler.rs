use std::time::{Duration, Instant};

/// why a refresh was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// something under a watched root changed, debounced
    FileChanged,
    /// the selected repository changed
    SelectionChanged,
    /// a root became or stopped being a repository
    RepositoriesChanged,
    /// the settings file changed on disk
    ConfigChanged,
    /// user asked for a refresh
    Manual,
}

/// decides when the next refresh runs
///
/// there is at most one pending (debounced) refresh. a newer trigger replaces
/// it rather than queueing another, and any refresh that runs clears it.
/// the periodic tick keeps its own fixed cadence. a one-shot recheck is kept
/// apart from the pending slot and only clears once its deadline has passed.
#[derive(Debug)]
pub struct Scheduler {
    periodic: Duration,
    debounce: Duration,
    next_tick: Instant,
    pending: Option<Instant>,
    recheck: Option<Instant>,
}

impl Scheduler {
    pub fn new(periodic: Duration, debounce: Duration, now: Instant) -> Self {
        Self {
            periodic,
            debounce,
            next_tick: now + periodic,
            pending: None,
            recheck: None,
        }
    }

    /// change timings, the next tick is rescheduled from `now`
    pub fn reconfigure(&mut self, periodic: Duration, debounce: Duration, now: Instant) {
        self.periodic = periodic;
        self.debounce = debounce;
        self.next_tick = now + periodic;
    }

    /// request a refresh at `at`, replacing any pending one
    pub fn defer_until(&mut self, at: Instant) {
        self.pending = Some(at);
    }

    /// one extra refresh at `at`, not cancelled by refreshes that run earlier
    pub fn schedule_recheck(&mut self, at: Instant) {
        self.recheck = Some(at);
    }

    /// register a trigger, true if the refresh should run right away
    pub fn trigger(&mut self, trigger: Trigger, now: Instant) -> bool {
        match trigger {
            Trigger::FileChanged => {
                self.defer_until(now + self.debounce);
                false
            }
            Trigger::SelectionChanged
            | Trigger::RepositoriesChanged
            | Trigger::ConfigChanged
            | Trigger::Manual => true,
        }
    }

    /// true if a pending refresh or the periodic tick is due
    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.is_some_and(|at| at <= now)
            || self.recheck.is_some_and(|at| at <= now)
            || self.next_tick <= now
    }

    /// record that a refresh ran at `now`
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.pending = None;
        if self.recheck.is_some_and(|at| at <= now) {
            self.recheck = None;
        }
        while self.next_tick <= now {
            self.next_tick += self.periodic;
        }
    }

    /// how long to wait for the next trigger before something is due
    pub fn wait_time(&self, now: Instant) -> Duration {
        let deadline = [self.pending, self.recheck]
            .into_iter()
            .flatten()
            .fold(self.next_tick, Instant::min);
        deadline.saturating_duration_since(now)
    }
}
