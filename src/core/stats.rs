//! Scheduler counters and their snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks waiting in the ready queue.
    pub queued: usize,
    /// Tasks dispatched and not yet persisted.
    pub in_flight: usize,
    /// Execution slots in use.
    pub active_slots: usize,
    /// Execution slot count.
    pub total_slots: usize,
    /// Task executions started.
    pub dispatched: u64,
    /// One-time tasks that completed.
    pub completed: u64,
    /// Recurring runs that were rescheduled.
    pub rescheduled: u64,
    /// Executions that failed.
    pub failed: u64,
    /// Fetch cycles attempted.
    pub fetch_cycles: u64,
    /// Fetch cycles that failed.
    pub fetch_errors: u64,
    /// Whether dispatching is paused.
    pub paused: bool,
}

/// Lock-free counters shared by the fetcher and dispatcher.
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub dispatched: AtomicU64,
    pub completed: AtomicU64,
    pub rescheduled: AtomicU64,
    pub failed: AtomicU64,
    pub fetch_cycles: AtomicU64,
    pub fetch_errors: AtomicU64,
}

impl SchedulerCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fill the counter fields of a snapshot.
    pub fn snapshot(&self, mut stats: SchedulerStats) -> SchedulerStats {
        stats.dispatched = self.dispatched.load(Ordering::Relaxed);
        stats.completed = self.completed.load(Ordering::Relaxed);
        stats.rescheduled = self.rescheduled.load(Ordering::Relaxed);
        stats.failed = self.failed.load(Ordering::Relaxed);
        stats.fetch_cycles = self.fetch_cycles.load(Ordering::Relaxed);
        stats.fetch_errors = self.fetch_errors.load(Ordering::Relaxed);
        stats
    }
}
