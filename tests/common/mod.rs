//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus_task_scheduler::builders::SchedulerBuilder;
use prometheus_task_scheduler::config::SchedulerConfig;
use prometheus_task_scheduler::core::{
    AppResult, ExecutionContext, ExecutionTime, Notifier, RecurrencePattern, SchedulerError, Task,
    TaskExecutor, TaskKind, TaskScheduler, TaskStore, TaskUpdateType,
};
use prometheus_task_scheduler::infra::InMemoryTaskStore;
use prometheus_task_scheduler::util::{Clock, Priority, TaskId, TaskStatus};
use tokio::sync::Semaphore;

// ============================================================================
// TASK BUILDERS
// ============================================================================

pub fn one_time(name: &str, due: DateTime<Utc>) -> Task {
    Task::new(
        name,
        Priority::Medium,
        ExecutionTime::once(due),
        TaskKind::FileCompression {
            file_directory: format!("/data/{name}"),
        },
    )
}

pub fn recurring(name: &str, pattern: RecurrencePattern, next: DateTime<Utc>) -> Task {
    Task::new(
        name,
        Priority::Medium,
        ExecutionTime::recurring(pattern, next).unwrap(),
        TaskKind::FolderWatcher {
            folder_directory: format!("/watch/{name}"),
        },
    )
}

/// Fast loop timings for end-to-end tests.
pub fn fast_config() -> SchedulerConfig {
    SchedulerConfig::default()
        .with_fetch_interval(Duration::from_millis(50))
        .with_dispatch_interval(Duration::from_millis(10))
        .with_retry_backoff(Duration::from_millis(20))
        .with_shutdown_grace(Duration::from_millis(500))
}

pub fn build(
    config: SchedulerConfig,
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    executor: Arc<dyn TaskExecutor>,
    clock: Option<Arc<dyn Clock>>,
) -> TaskScheduler {
    let mut builder = SchedulerBuilder::new()
        .config(config)
        .store(store)
        .notifier(notifier)
        .executor(executor);
    if let Some(clock) = clock {
        builder = builder.clock(clock);
    }
    builder.build().unwrap()
}

pub async fn status_of(store: &dyn TaskStore, id: TaskId) -> TaskStatus {
    store.get_task_by_id(id).await.unwrap().unwrap().status()
}

/// Poll the store until `done` holds for task `id` or `limit` elapses.
pub async fn wait_for<F>(store: &dyn TaskStore, id: TaskId, limit: Duration, done: F) -> Task
where
    F: Fn(&Task) -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let task = store.get_task_by_id(id).await.unwrap().unwrap();
        if done(&task) {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} did not reach the expected state, last status {}",
            task.status()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ============================================================================
// TEST EXECUTORS
// ============================================================================

/// Counts executions and the highest number running at once.
#[derive(Default)]
pub struct CountingExecutor {
    pub runs: AtomicUsize,
    pub running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub work: Duration,
    pub seen: Mutex<Vec<TaskId>>,
}

impl CountingExecutor {
    pub fn with_work(work: Duration) -> Self {
        Self {
            work,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for CountingExecutor {
    async fn execute(&self, task: &mut Task, ctx: &ExecutionContext) -> AppResult<()> {
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);
        self.seen.lock().push(task.id);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        task.log.append(format!("ran on worker {}", ctx.worker_id));
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always returns an error.
pub struct FailingExecutor;

#[async_trait]
impl TaskExecutor for FailingExecutor {
    async fn execute(&self, _task: &mut Task, _ctx: &ExecutionContext) -> AppResult<()> {
        anyhow::bail!("disk unavailable")
    }
}

/// Panics inside the task body.
pub struct PanickingExecutor;

#[async_trait]
impl TaskExecutor for PanickingExecutor {
    async fn execute(&self, _task: &mut Task, _ctx: &ExecutionContext) -> AppResult<()> {
        panic!("corrupt archive")
    }
}

/// Blocks every run until a permit is added to `gate`.
pub struct GatedExecutor {
    pub gate: Arc<Semaphore>,
    pub started: AtomicUsize,
}

impl GatedExecutor {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            started: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TaskExecutor for GatedExecutor {
    async fn execute(&self, _task: &mut Task, _ctx: &ExecutionContext) -> AppResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await?;
        permit.forget();
        Ok(())
    }
}

// ============================================================================
// TEST NOTIFIER
// ============================================================================

/// Records every notification with the task's status at that moment.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(TaskId, TaskUpdateType, TaskStatus)>>,
}

impl RecordingNotifier {
    fn record(&self, task: &Task, update: TaskUpdateType) {
        self.events.lock().push((task.id, update, task.status()));
    }

    pub fn for_task(&self, id: TaskId) -> Vec<(TaskUpdateType, TaskStatus)> {
        self.events
            .lock()
            .iter()
            .filter(|(task_id, _, _)| *task_id == id)
            .map(|(_, update, status)| (*update, *status))
            .collect()
    }

    pub fn count(&self, update: TaskUpdateType) -> usize {
        self.events.lock().iter().filter(|(_, u, _)| *u == update).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_task_updated(&self, task: &Task) {
        self.record(task, TaskUpdateType::Updated);
    }
    fn notify_status_changed(&self, task: &Task) {
        self.record(task, TaskUpdateType::StatusChanged);
    }
    fn notify_log_added(&self, task: &Task) {
        self.record(task, TaskUpdateType::LogAdded);
    }
    fn notify_execution_time_changed(&self, task: &Task) {
        self.record(task, TaskUpdateType::ExecutionTimeChanged);
    }
    fn notify_task_created(&self, task: &Task) {
        self.record(task, TaskUpdateType::Created);
    }
    fn notify_task_deleted(&self, task: &Task) {
        self.record(task, TaskUpdateType::Deleted);
    }
}

// ============================================================================
// TEST STORES
// ============================================================================

/// In-memory store whose status queries fail or stall on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryTaskStore,
    pub failures_left: AtomicUsize,
    pub stall: Mutex<Option<Duration>>,
    pub queries: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            stall: Mutex::new(Some(delay)),
            ..Self::default()
        }
    }
}

/// Store whose Nth save from the moment it is armed fails or panics.
#[derive(Default)]
pub struct ScriptedSaves {
    pub inner: InMemoryTaskStore,
    fail_in: AtomicUsize,
    panic_in: AtomicUsize,
}

impl ScriptedSaves {
    pub fn fail_save(&self, nth: usize) {
        self.fail_in.store(nth, Ordering::SeqCst);
    }

    pub fn panic_on_save(&self, nth: usize) {
        self.panic_in.store(nth, Ordering::SeqCst);
    }

    fn fires(countdown: &AtomicUsize) -> bool {
        countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok_and(|n| n == 1)
    }
}

#[async_trait]
impl TaskStore for ScriptedSaves {
    async fn save_task(&self, task: &mut Task) -> Result<TaskId, SchedulerError> {
        if Self::fires(&self.panic_in) {
            panic!("save of task {} blew up", task.id);
        }
        if Self::fires(&self.fail_in) {
            return Err(SchedulerError::Store("disk full".into()));
        }
        self.inner.save_task(task).await
    }

    async fn get_tasks_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<Task>, SchedulerError> {
        self.inner.get_tasks_by_status(statuses).await
    }

    async fn get_task_by_id(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        self.inner.get_task_by_id(id).await
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), SchedulerError> {
        self.inner.update_task_status(id, status).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        self.inner.delete_task(id).await
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, SchedulerError> {
        self.inner.get_all_tasks().await
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn save_task(&self, task: &mut Task) -> Result<TaskId, SchedulerError> {
        self.inner.save_task(task).await
    }

    async fn get_tasks_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<Task>, SchedulerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let stall = *self.stall.lock();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(SchedulerError::Store("database is locked".into()));
        }
        self.inner.get_tasks_by_status(statuses).await
    }

    async fn get_task_by_id(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        self.inner.get_task_by_id(id).await
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), SchedulerError> {
        self.inner.update_task_status(id, status).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        self.inner.delete_task(id).await
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, SchedulerError> {
        self.inner.get_all_tasks().await
    }
}
