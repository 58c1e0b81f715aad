//! Scheduler facade owning the fetcher, ready queue and dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::Dispatcher;
use super::error::SchedulerError;
use super::fetcher::Fetcher;
use super::ready_queue::ReadyQueue;
use super::shared::Shared;
use super::slots::ExecutionSlots;
use super::stats::SchedulerStats;
use super::task::Task;
use crate::config::SchedulerConfig;
use crate::runtime::TokioSpawner;
use crate::util::serde::TaskId;

/// The single object surrounding code talks to.
///
/// Build one with [`SchedulerBuilder`](crate::builders::SchedulerBuilder).
/// Nothing fails across this boundary during normal operation: store and
/// task failures are logged, recorded on the task and reported through the
/// notifier.
pub struct TaskScheduler {
    config: SchedulerConfig,
    shared: Shared,
    slots: Arc<ExecutionSlots>,
    fetcher: Arc<Fetcher>,
    dispatcher: Arc<Dispatcher>,
    spawner: TokioSpawner,
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    started: AtomicBool,
    disposed: AtomicBool,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScheduler {
    pub(crate) fn new(
        config: SchedulerConfig,
        shared: Shared,
        fetcher: Fetcher,
        dispatcher: Dispatcher,
        slots: Arc<ExecutionSlots>,
        paused: Arc<AtomicBool>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            config,
            shared,
            slots,
            fetcher: Arc::new(fetcher),
            dispatcher: Arc::new(dispatcher),
            spawner,
            cancel: CancellationToken::new(),
            paused,
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Start the fetcher and dispatcher loops. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` after [`dispose`](Self::dispose).
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.is_disposed() {
            return Err(SchedulerError::Shutdown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let fetcher = Arc::clone(&self.fetcher);
        let cancel = self.cancel.clone();
        let fetch_loop = self.spawner.spawn(async move { fetcher.run(cancel).await });

        let dispatcher = Arc::clone(&self.dispatcher);
        let dispatch_loop = self.spawner.spawn(dispatcher.run(self.cancel.clone()));

        self.loops.lock().extend([fetch_loop, dispatch_loop]);
        info!(
            max_queue_size = self.config.max_queue_size,
            max_concurrent_tasks = self.config.max_concurrent_tasks,
            "task scheduler started"
        );
        Ok(())
    }

    /// Stop dispatching. The fetcher keeps filling the queue and running
    /// tasks finish normally.
    pub fn pause(&self) {
        if self.is_disposed() {
            return;
        }
        if !self.paused.swap(true, Ordering::AcqRel) {
            info!("task scheduler paused");
        }
    }

    /// Resume dispatching. Ignored once disposed.
    pub fn resume(&self) {
        if self.is_disposed() {
            return;
        }
        if self.paused.swap(false, Ordering::AcqRel) {
            info!("task scheduler resumed");
        }
    }

    /// Whether dispatching is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether the loops were started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Cancel both loops, wait up to the shutdown grace period for them to
    /// exit, then release the queue and the execution slots. Idempotent.
    ///
    /// Executions already running are not interrupted.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();

        let loops: Vec<JoinHandle<()>> = self.loops.lock().drain(..).collect();
        let aborts: Vec<_> = loops.iter().map(JoinHandle::abort_handle).collect();
        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, futures::future::join_all(loops))
            .await
            .is_err()
        {
            warn!(grace_ms = grace.as_millis(), "scheduler loops did not stop in time, aborting");
            for handle in aborts {
                handle.abort();
            }
        }

        self.slots.close();
        self.shared.queue.clear();
        info!("task scheduler disposed");
    }

    /// Persist a new task and announce it.
    ///
    /// # Errors
    ///
    /// `SchedulerError::Shutdown` after dispose, `SchedulerError::InvalidSchedule`
    /// for a task without an execution time, or the store's error.
    pub async fn submit_task(&self, mut task: Task) -> Result<TaskId, SchedulerError> {
        if self.is_disposed() {
            return Err(SchedulerError::Shutdown);
        }
        if task.execution_time.is_none() {
            return Err(SchedulerError::InvalidSchedule(format!(
                "task {} has no execution time",
                task.name
            )));
        }
        let id = self
            .shared
            .store_call("task save", self.shared.store.save_task(&mut task))
            .await?;
        self.shared.notifier.notify_task_created(&task);
        debug!(task_id = id, due = ?task.due_at(), "task submitted");
        Ok(id)
    }

    /// Delete a task from the store and drop any queued copy.
    ///
    /// A run already in progress is not interrupted.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        let removed = self
            .shared
            .store_call("task delete", self.shared.store.delete_task(id))
            .await?;
        self.shared.queue.remove(id);
        if let Some(task) = &removed {
            self.shared.notifier.notify_task_deleted(task);
            debug!(task_id = id, "task deleted");
        }
        Ok(removed)
    }

    /// Current counters and queue occupancy.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot(SchedulerStats {
            queued: self.shared.queue.len(),
            in_flight: self.shared.queue.in_flight_len(),
            active_slots: self.slots.active(),
            total_slots: self.slots.size(),
            paused: self.is_paused(),
            ..SchedulerStats::default()
        })
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The ready queue.
    #[must_use]
    pub fn queue(&self) -> &ReadyQueue {
        &self.shared.queue
    }

    /// The fetcher, for driving cycles by hand.
    #[must_use]
    pub const fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// The dispatcher, for driving cycles by hand.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
