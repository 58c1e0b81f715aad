//! Core scheduling: task model, recurrence, ready queue, fetcher,
//! dispatcher and the scheduler facade.

pub mod dispatcher;
pub mod error;
pub mod execution_time;
pub mod executor;
pub mod fetcher;
pub mod notifier;
pub mod ready_queue;
pub mod recurrence;
pub mod scheduler;
pub(crate) mod shared;
pub mod slots;
pub mod stats;
pub mod store;
pub mod task;

pub use dispatcher::Dispatcher;
pub use error::{AppResult, SchedulerError};
pub use execution_time::ExecutionTime;
pub use executor::{BuiltinExecutor, ExecutionContext, TaskExecutor};
pub use fetcher::{FetchReport, Fetcher};
pub use notifier::{NoopNotifier, Notifier, TaskUpdateEvent, TaskUpdateType};
pub use ready_queue::{Offer, ReadyQueue};
pub use recurrence::{missed_occurrences, next_execution_time, RecurrencePattern};
pub use scheduler::TaskScheduler;
pub use slots::{ExecutionSlots, SlotGuard};
pub use stats::SchedulerStats;
pub use store::TaskStore;
pub use task::{Task, TaskKind, TaskLog, ERROR_LOG_PREFIX};
