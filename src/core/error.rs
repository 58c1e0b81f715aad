//! Error types for scheduler operations.

use thiserror::Error;

use crate::util::serde::{TaskId, TaskStatus};

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Ready queue is at capacity.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Task is already tracked by the ready queue.
    #[error("task {0} is already queued")]
    DuplicateTask(TaskId),
    /// Requested lifecycle transition is not allowed.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
    /// Execution-time descriptor is inconsistent.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    /// Task store failure with context.
    #[error("store error: {0}")]
    Store(String),
    /// An operation exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),
    /// A task body failed.
    #[error("execution failed: {0}")]
    Execution(String),
    /// Configuration or construction-time validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The scheduler has been disposed.
    #[error("scheduler has been shut down")]
    Shutdown,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for task bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
