//! Fail-fast construction of a [`TaskScheduler`].

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::SchedulerConfig;
use crate::core::dispatcher::Dispatcher;
use crate::core::fetcher::Fetcher;
use crate::core::shared::Shared;
use crate::core::stats::SchedulerCounters;
use crate::core::{
    BuiltinExecutor, ExecutionSlots, Notifier, ReadyQueue, SchedulerError, TaskExecutor,
    TaskScheduler, TaskStore,
};
use crate::runtime::TokioSpawner;
use crate::util::clock::{Clock, SystemClock};

/// Collects the collaborators of a [`TaskScheduler`].
///
/// A store and a notifier are required. The executor defaults to
/// [`BuiltinExecutor`], the clock to [`SystemClock`], and the runtime to the
/// one `build` is called from.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .store(Arc::new(InMemoryTaskStore::new()))
///     .notifier(Arc::new(BroadcastNotifier::default()))
///     .build()?;
/// scheduler.start()?;
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    store: Option<Arc<dyn TaskStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    executor: Arc<dyn TaskExecutor>,
    clock: Arc<dyn Clock>,
    handle: Option<Handle>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            store: None,
            notifier: None,
            executor: Arc::new(BuiltinExecutor),
            clock: Arc::new(SystemClock),
            handle: None,
        }
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Task store. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Notifier. Required.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Executor for task bodies.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Clock used for every due-time comparison.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runtime to spawn the loops and executions on.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Assemble the scheduler. The loops are not started.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` when the store or notifier is
    /// missing, the configuration is invalid, or no tokio runtime is
    /// available.
    pub fn build(self) -> Result<TaskScheduler, SchedulerError> {
        self.config.validate().map_err(SchedulerError::InvalidConfig)?;
        let store = self
            .store
            .ok_or_else(|| SchedulerError::InvalidConfig("a task store is required".into()))?;
        let notifier = self
            .notifier
            .ok_or_else(|| SchedulerError::InvalidConfig("a notifier is required".into()))?;
        let spawner = self
            .handle
            .map(TokioSpawner::new)
            .or_else(TokioSpawner::current)
            .ok_or_else(|| SchedulerError::InvalidConfig("no tokio runtime available".into()))?;

        let shared = Shared {
            store,
            notifier,
            queue: Arc::new(ReadyQueue::new(self.config.max_queue_size)),
            clock: self.clock,
            counters: Arc::new(SchedulerCounters::default()),
            store_timeout: self.config.store_timeout(),
        };
        let slots = Arc::new(ExecutionSlots::new(self.config.max_concurrent_tasks));
        let paused = Arc::new(AtomicBool::new(false));

        let fetcher = Fetcher::new(shared.clone(), &self.config)?;
        let dispatcher = Dispatcher::new(
            shared.clone(),
            self.executor,
            Arc::clone(&slots),
            Arc::clone(&paused),
            spawner.clone(),
            &self.config,
        );
        Ok(TaskScheduler::new(
            self.config,
            shared,
            fetcher,
            dispatcher,
            slots,
            paused,
            spawner,
        ))
    }
}
