//! Task execution traits and the built-in task kinds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::AppResult;
use super::task::{Task, TaskKind};
use crate::util::serde::WorkerId;

/// Per-attempt context handed to an executor.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Execution slot running the task.
    pub worker_id: WorkerId,
    /// Unique identifier of this attempt.
    pub run_id: Uuid,
    /// When the slot picked the task up.
    pub started_at: DateTime<Utc>,
}

/// Abstraction for running a task's type-specific logic.
///
/// The executor is the only place with side effects beyond the store and
/// the notifier. It may append to `task.log`; the dispatcher owns every
/// other field. Returning an error marks the attempt as failed.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_scheduler::core::{AppResult, ExecutionContext, Task, TaskExecutor};
///
/// struct Ping;
///
/// #[async_trait]
/// impl TaskExecutor for Ping {
///     async fn execute(&self, task: &mut Task, ctx: &ExecutionContext) -> AppResult<()> {
///         task.log.append(format!("pinged from worker {}", ctx.worker_id));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Run the task body.
    ///
    /// # Errors
    ///
    /// Any error is recorded in the task log and the task is marked failed.
    async fn execute(&self, task: &mut Task, ctx: &ExecutionContext) -> AppResult<()>;
}

/// Executor for the built-in [`TaskKind`]s.
///
/// Each kind records the action it performs in the task log.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinExecutor;

impl BuiltinExecutor {
    fn describe(kind: &TaskKind) -> String {
        match kind {
            TaskKind::EmailNotification {
                sender_email,
                recipient_email,
                subject,
                message_body,
            } => format!(
                "Sending email from {sender_email} to {recipient_email}\nSubject: {subject}\nMessage: {message_body}"
            ),
            TaskKind::FileBackup {
                source_directory,
                target_directory,
            } => format!("Copying files from {source_directory} to {target_directory}"),
            TaskKind::FileCompression { file_directory } => {
                format!("Compressing files in directory {file_directory}")
            }
            TaskKind::FolderWatcher { folder_directory } => {
                format!("Monitoring folder {folder_directory} for changes")
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for BuiltinExecutor {
    async fn execute(&self, task: &mut Task, ctx: &ExecutionContext) -> AppResult<()> {
        let action = Self::describe(&task.kind);
        tracing::debug!(task_id = task.id, kind = task.kind.label(), "running built-in task");
        task.log.append(format!(
            "{}: {}: {action}",
            ctx.started_at.to_rfc3339(),
            task.kind.label()
        ));
        Ok(())
    }
}
