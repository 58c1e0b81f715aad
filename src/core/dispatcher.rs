//! Drains the ready queue into execution slots and runs the per-task
//! execution protocol.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::error::SchedulerError;
use super::executor::{ExecutionContext, TaskExecutor};
use super::ready_queue::ReadyQueue;
use super::recurrence::missed_occurrences;
use super::shared::Shared;
use super::slots::{ExecutionSlots, SlotGuard};
use super::stats::SchedulerCounters;
use super::task::{Task, ERROR_LOG_PREFIX};
use crate::config::SchedulerConfig;
use crate::runtime::TokioSpawner;
use crate::util::serde::{TaskId, TaskStatus, WorkerId};

/// Clears a task's in-flight mark when its execution ends, even by panic.
struct InFlight<'a> {
    queue: &'a ReadyQueue,
    task_id: TaskId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.queue.release(self.task_id);
    }
}

/// Moves due tasks from the ready queue into free execution slots.
pub struct Dispatcher {
    shared: Shared,
    executor: Arc<dyn TaskExecutor>,
    slots: Arc<ExecutionSlots>,
    paused: Arc<AtomicBool>,
    spawner: TokioSpawner,
    interval: Duration,
    task_timeout: Option<Duration>,
}

impl Dispatcher {
    pub(crate) fn new(
        shared: Shared,
        executor: Arc<dyn TaskExecutor>,
        slots: Arc<ExecutionSlots>,
        paused: Arc<AtomicBool>,
        spawner: TokioSpawner,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            shared,
            executor,
            slots,
            paused,
            spawner,
            interval: config.dispatch_interval(),
            task_timeout: config.task_timeout(),
        }
    }

    /// Whether dispatching is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Run one dispatch cycle.
    ///
    /// While a slot is free, takes the next due task and spawns its
    /// execution. Tasks that are not yet due keep their place in the queue.
    /// Does nothing while paused. Returns the handles of the spawned
    /// executions.
    pub fn dispatch_once(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut spawned = Vec::new();
        if self.is_paused() {
            return spawned;
        }
        let now = self.shared.clock.now();
        while let Some(slot) = self.slots.try_acquire() {
            let Some(task) = self.shared.queue.pop_due(now) else {
                break;
            };
            let this = Arc::clone(self);
            spawned.push(self.spawner.spawn(async move { this.execute(task, slot).await }));
        }
        if !spawned.is_empty() {
            debug!(
                dispatched = spawned.len(),
                active_slots = self.slots.active(),
                queued = self.shared.queue.len(),
                "dispatch cycle complete"
            );
        }
        spawned
    }

    /// Dispatch on a fixed interval until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis(), "dispatcher started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            drop(self.dispatch_once());
        }
        debug!("dispatcher stopped");
    }

    async fn execute(&self, task: Task, slot: SlotGuard) {
        let task_id = task.id;
        let in_flight = InFlight {
            queue: &self.shared.queue,
            task_id,
        };
        let ctx = ExecutionContext {
            worker_id: slot.worker_id(),
            run_id: Uuid::new_v4(),
            started_at: self.shared.clock.now(),
        };
        let span = info_span!(
            "task_run",
            task_id,
            worker_id = ctx.worker_id,
            run_id = %ctx.run_id
        );
        self.run_protocol(task, &ctx).instrument(span).await;
        drop(in_flight);
        drop(slot);
    }

    async fn run_protocol(&self, queued: Task, ctx: &ExecutionContext) {
        let Some(mut task) = self.claim(queued).await else {
            return;
        };
        if let Err(e) = self.mark_running(&mut task, ctx.worker_id).await {
            warn!(error = %e, "could not mark task running");
            return;
        }
        let scheduled = task.execution_time.clone();
        if let Err(e) = self.run_attempt(&mut task, ctx).await {
            // A failed attempt keeps the due time it was dispatched for.
            task.execution_time = scheduled;
            self.record_failure(&mut task, &e).await;
        }
    }

    /// Re-read the task so a stale queued copy is never executed.
    async fn claim(&self, queued: Task) -> Option<Task> {
        let lookup = self
            .shared
            .store_call("task lookup", self.shared.store.get_task_by_id(queued.id))
            .await;
        match lookup {
            Ok(Some(latest))
                if TaskStatus::SCHEDULABLE.contains(&latest.status())
                    && latest.is_due(self.shared.clock.now()) =>
            {
                Some(latest)
            }
            Ok(Some(latest)) => {
                debug!(status = %latest.status(), "task changed since it was queued");
                None
            }
            Ok(None) => {
                debug!("task was deleted before it ran");
                None
            }
            Err(e) => {
                warn!(error = %e, "could not load task for execution");
                None
            }
        }
    }

    async fn mark_running(
        &self,
        task: &mut Task,
        worker_id: WorkerId,
    ) -> Result<(), SchedulerError> {
        task.set_status(TaskStatus::Running)?;
        task.worker_id = Some(worker_id);
        self.persist(task).await?;
        SchedulerCounters::incr(&self.shared.counters.dispatched);
        self.shared.notifier.notify_status_changed(task);
        Ok(())
    }

    async fn run_attempt(
        &self,
        task: &mut Task,
        ctx: &ExecutionContext,
    ) -> Result<(), SchedulerError> {
        self.invoke(task, ctx).await?;
        let now = self.shared.clock.now();
        task.last_completion_time = Some(now);

        if task.is_recurring() {
            self.reschedule(task, now).await?;
            SchedulerCounters::incr(&self.shared.counters.rescheduled);
        } else {
            task.set_status(TaskStatus::Completed)?;
            SchedulerCounters::incr(&self.shared.counters.completed);
        }

        self.persist(task).await?;
        self.shared.notifier.notify_task_updated(task);
        Ok(())
    }

    async fn reschedule(
        &self,
        task: &mut Task,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let Some(execution_time) = task.execution_time.as_mut() else {
            return Err(SchedulerError::InvalidSchedule("task has no execution time".into()));
        };
        let missed = execution_time
            .next_execution_time()
            .map_or(0, |previous| missed_occurrences(execution_time.pattern(), previous, now));
        let next = execution_time.advance(now).ok_or_else(|| {
            SchedulerError::InvalidSchedule("recurring task has no interval".into())
        })?;
        task.set_status(TaskStatus::Pending)?;

        let mut entry = format!(
            "{}: Task {} will run again at {}",
            now.to_rfc3339(),
            task.name,
            next.to_rfc3339()
        );
        if missed > 1 {
            entry.push_str(&format!(" ({missed} occurrences were overdue)"));
        }
        task.log.append(entry);
        debug!(next = %next, missed, "recurring task rescheduled");

        self.persist(task).await?;
        self.shared.notifier.notify_execution_time_changed(task);
        self.shared.notifier.notify_log_added(task);
        Ok(())
    }

    async fn invoke(&self, task: &mut Task, ctx: &ExecutionContext) -> Result<(), SchedulerError> {
        let body = AssertUnwindSafe(self.executor.execute(task, ctx)).catch_unwind();
        let outcome = match self.task_timeout {
            Some(limit) => tokio::time::timeout(limit, body)
                .await
                .map_err(|_| SchedulerError::Timeout(format!("task body exceeded {limit:?}")))?,
            None => body.await,
        };
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SchedulerError::Execution(format!("{e:#}"))),
            Err(panic) => Err(SchedulerError::Execution(panic_message(panic.as_ref()))),
        }
    }

    async fn record_failure(&self, task: &mut Task, cause: &SchedulerError) {
        error!(error = %cause, "task execution failed");
        task.log.append(format!(
            "{ERROR_LOG_PREFIX}Error executing task {} (ID: {}): {cause}",
            task.name, task.id
        ));
        task.last_completion_time = Some(self.shared.clock.now());
        task.force_status(TaskStatus::Failed);
        SchedulerCounters::incr(&self.shared.counters.failed);

        if let Err(e) = self.persist(task).await {
            warn!(error = %e, "could not persist failed task");
        }
        self.shared.notifier.notify_status_changed(task);
        self.shared.notifier.notify_log_added(task);
    }

    async fn persist(&self, task: &mut Task) -> Result<(), SchedulerError> {
        self.shared
            .store_call("task save", self.shared.store.save_task(task))
            .await
            .map(drop)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "task panicked".to_string(), |msg| format!("task panicked: {msg}"))
}
