//! Lifecycle notifications for observers of the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// Kind of change a [`TaskUpdateEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskUpdateType {
    /// A task was submitted.
    Created,
    /// Any task field changed.
    Updated,
    /// The task's status changed.
    StatusChanged,
    /// A log entry was appended.
    LogAdded,
    /// The next execution time was recomputed.
    ExecutionTimeChanged,
    /// A task was removed from the store.
    Deleted,
}

impl TaskUpdateType {
    /// Name of the task property the update concerns, if any.
    #[must_use]
    pub const fn property(self) -> Option<&'static str> {
        match self {
            Self::StatusChanged => Some("status"),
            Self::LogAdded => Some("log"),
            Self::ExecutionTimeChanged => Some("execution_time"),
            Self::Created | Self::Updated | Self::Deleted => None,
        }
    }
}

/// Snapshot of a task at the moment a notification was raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateEvent {
    /// Task snapshot.
    pub task: Task,
    /// What changed.
    pub update: TaskUpdateType,
    /// When the notification was raised.
    pub at: DateTime<Utc>,
}

impl TaskUpdateEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(task: &Task, update: TaskUpdateType) -> Self {
        Self {
            task: task.clone(),
            update,
            at: Utc::now(),
        }
    }
}

/// Fan-out of task lifecycle events.
///
/// Calls are fire-and-forget and must return promptly; they run on the
/// fetcher loop and on execution slots.
pub trait Notifier: Send + Sync + 'static {
    /// Any change to a task.
    fn notify_task_updated(&self, task: &Task);
    /// The task's status changed.
    fn notify_status_changed(&self, task: &Task);
    /// A log entry was appended.
    fn notify_log_added(&self, task: &Task);
    /// The next execution time was recomputed.
    fn notify_execution_time_changed(&self, task: &Task);
    /// A task was submitted.
    fn notify_task_created(&self, _task: &Task) {}
    /// A task was deleted.
    fn notify_task_deleted(&self, _task: &Task) {}
}

/// Notifier that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify_task_updated(&self, _task: &Task) {}
    fn notify_status_changed(&self, _task: &Task) {}
    fn notify_log_added(&self, _task: &Task) {}
    fn notify_execution_time_changed(&self, _task: &Task) {}
}
