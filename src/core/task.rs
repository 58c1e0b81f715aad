//! The schedulable task entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SchedulerError;
use super::execution_time::ExecutionTime;
use crate::util::serde::{Priority, TaskId, TaskStatus, WorkerId};

/// Prefix of log entries written when an execution attempt fails.
pub const ERROR_LOG_PREFIX: &str = "ERROR: ";

/// Type-specific payload of a task. Irrelevant to scheduling; consumed by
/// the [`TaskExecutor`](super::executor::TaskExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Send an email.
    EmailNotification {
        /// Sender address.
        sender_email: String,
        /// Recipient address.
        recipient_email: String,
        /// Subject line.
        subject: String,
        /// Message body.
        message_body: String,
    },
    /// Copy files from one directory to another.
    FileBackup {
        /// Directory to copy from.
        source_directory: String,
        /// Directory to copy into.
        target_directory: String,
    },
    /// Compress the files of a directory.
    FileCompression {
        /// Directory to compress.
        file_directory: String,
    },
    /// Watch a folder for changes.
    FolderWatcher {
        /// Directory to watch.
        folder_directory: String,
    },
}

impl TaskKind {
    /// Human readable kind label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EmailNotification { .. } => "Email Notification Task",
            Self::FileBackup { .. } => "File Backup Task",
            Self::FileCompression { .. } => "File Compression Task",
            Self::FolderWatcher { .. } => "Folder Watcher Task",
        }
    }
}

/// Append-only log of lifecycle events for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskLog {
    entries: Vec<String>,
}

impl TaskLog {
    /// Append an entry.
    pub fn append(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries written by failed execution attempts.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(String::as_str)
            .filter(|entry| entry.starts_with(ERROR_LOG_PREFIX))
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier; zero until first persisted.
    pub id: TaskId,
    /// Display label.
    pub name: String,
    /// Tie-break priority.
    pub priority: Priority,
    status: TaskStatus,
    /// When the task is due. A task without one is never scheduled.
    pub execution_time: Option<ExecutionTime>,
    /// Execution slot of the last (or current) run.
    pub worker_id: Option<WorkerId>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Set after every execution attempt.
    pub last_completion_time: Option<DateTime<Utc>>,
    /// Lifecycle log.
    pub log: TaskLog,
    /// Type-specific payload.
    pub kind: TaskKind,
}

impl Task {
    /// Create a pending, not-yet-persisted task.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        priority: Priority,
        execution_time: ExecutionTime,
        kind: TaskKind,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            priority,
            status: TaskStatus::Pending,
            execution_time: Some(execution_time),
            worker_id: None,
            created_at: Utc::now(),
            last_completion_time: None,
            log: TaskLog::default(),
            kind,
        }
    }

    /// Override the status without lifecycle checks, for rehydrating
    /// persisted tasks.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTransition` otherwise.
    pub fn set_status(&mut self, next: TaskStatus) -> Result<(), SchedulerError> {
        if !self.status.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Set the status unconditionally; used when an attempt fails after the
    /// task already reached a terminal state in memory.
    pub(crate) fn force_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Whether the task has been persisted.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Due instant, if the task has an execution time.
    #[must_use]
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.execution_time.as_ref().and_then(ExecutionTime::due_at)
    }

    /// Whether the task is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.execution_time.as_ref().is_some_and(|et| et.is_due(now))
    }

    /// Whether the task repeats.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.execution_time
            .as_ref()
            .is_some_and(ExecutionTime::is_recurring)
    }
}
