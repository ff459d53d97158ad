//! Periodic status and signal strength polling

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tokio::time::{Interval, MissedTickBehavior};

/// Queries to re-issue on a poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTargets {
    pub status: bool,
    pub signal: bool,
}

/// Shared timer settings for the status and signal polls
///
/// Both polls run on the same tick and can be toggled at runtime. Whether
/// a tick does any work at all also depends on the connection state, which
/// the driver checks.
#[derive(Debug)]
pub struct Poller {
    period: Duration,
    status: AtomicBool,
    signal: AtomicBool,
}

impl Poller {
    pub fn new(period: Duration, status: bool, signal: bool) -> Self {
        Self {
            period,
            status: AtomicBool::new(status),
            signal: AtomicBool::new(signal),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_status_polling(&self, enabled: bool) {
        self.status.store(enabled, Ordering::Relaxed);
    }

    pub fn set_signal_polling(&self, enabled: bool) {
        self.signal.store(enabled, Ordering::Relaxed);
    }

    /// Enabled polls, or `None` if the tick can be skipped
    pub fn targets(&self) -> Option<PollTargets> {
        let targets = PollTargets {
            status: self.status.load(Ordering::Relaxed),
            signal: self.signal.load(Ordering::Relaxed),
        };
        (targets.status || targets.signal).then_some(targets)
    }

    /// Timer whose first tick fires one period from now
    ///
    /// Ticks missed while a poll was stuck in a slow exchange are not
    /// replayed in a burst.
    pub fn ticker(&self) -> Interval {
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}
