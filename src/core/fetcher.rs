//! Periodic bridge from the task store to the ready queue.

use std::collections::HashSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SchedulerError;
use super::ready_queue::Offer;
use super::shared::Shared;
use super::stats::SchedulerCounters;
use super::task::Task;
use crate::config::SchedulerConfig;
use crate::util::serde::{TaskId, TaskStatus};

/// Outcome of one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Tasks inside the lookahead window.
    pub candidates: usize,
    /// Newly queued tasks.
    pub enqueued: usize,
    /// Queued copies replaced because their due instant changed.
    pub replaced: usize,
    /// Candidates already queued or executing.
    pub skipped: usize,
    /// Queued tasks dropped because they left the store or the window.
    pub evicted: usize,
    /// Whether the cycle stopped at queue capacity.
    pub saturated: bool,
}

/// Loads schedulable tasks due within the lookahead window into the ready
/// queue.
pub struct Fetcher {
    shared: Shared,
    lookahead: chrono::Duration,
    interval: Duration,
    retry_backoff: Duration,
}

impl Fetcher {
    pub(crate) fn new(shared: Shared, config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let lookahead = chrono::Duration::from_std(config.lookahead())
            .map_err(|e| SchedulerError::InvalidConfig(format!("lookahead: {e}")))?;
        Ok(Self {
            shared,
            lookahead,
            interval: config.fetch_interval(),
            retry_backoff: config.retry_backoff(),
        })
    }

    /// Run a single fetch cycle.
    ///
    /// Candidates are ordered by due instant, then by descending priority,
    /// and offered until the queue is full. Queued tasks that no longer
    /// appear in the window are evicted first.
    ///
    /// # Errors
    ///
    /// Returns the store's error, or `SchedulerError::Timeout` if the query
    /// exceeds the store timeout. The queue is left untouched in that case.
    pub async fn fetch_once(&self) -> Result<FetchReport, SchedulerError> {
        let counters = &self.shared.counters;
        SchedulerCounters::incr(&counters.fetch_cycles);
        let tasks = self
            .shared
            .store_call(
                "pending task query",
                self.shared.store.get_tasks_by_status(&TaskStatus::SCHEDULABLE),
            )
            .await
            .inspect_err(|_| SchedulerCounters::incr(&counters.fetch_errors))?;

        let horizon = self.shared.clock.now() + self.lookahead;
        let mut candidates: Vec<Task> = tasks
            .into_iter()
            .filter(|t| t.is_persisted() && t.due_at().is_some_and(|due| due <= horizon))
            .collect();
        candidates.sort_by(|a, b| {
            a.due_at()
                .cmp(&b.due_at())
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.id.cmp(&b.id))
        });

        let live: HashSet<TaskId> = candidates.iter().map(|t| t.id).collect();
        let mut report = FetchReport {
            candidates: candidates.len(),
            evicted: self.shared.queue.retain_ids(&live),
            ..FetchReport::default()
        };

        for task in candidates {
            let snapshot = task.clone();
            match self.shared.queue.offer(task) {
                Offer::Enqueued => report.enqueued += 1,
                Offer::Replaced => report.replaced += 1,
                Offer::Duplicate | Offer::InFlight => {
                    report.skipped += 1;
                    continue;
                }
                Offer::Full => {
                    report.saturated = true;
                    break;
                }
            }
            self.shared.notifier.notify_task_updated(&snapshot);
        }

        debug!(
            candidates = report.candidates,
            enqueued = report.enqueued,
            replaced = report.replaced,
            skipped = report.skipped,
            evicted = report.evicted,
            saturated = report.saturated,
            queued = self.shared.queue.len(),
            "fetch cycle complete"
        );
        Ok(report)
    }

    /// Fetch on a fixed interval until `cancel` fires. A failed cycle is
    /// retried after the backoff.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis(), "fetcher started");
        loop {
            let delay = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.fetch_once() => match result {
                    Ok(_) => self.interval,
                    Err(e) => {
                        warn!(error = %e, backoff_ms = self.retry_backoff.as_millis(), "fetch cycle failed");
                        self.retry_backoff
                    }
                },
            };
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        debug!("fetcher stopped");
    }
}
