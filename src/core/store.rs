//! Task persistence abstraction.

use async_trait::async_trait;

use super::error::SchedulerError;
use super::task::Task;
use crate::util::serde::{TaskId, TaskStatus};

/// Durable task persistence and query-by-status.
///
/// Implementations are called concurrently from the fetcher loop and from
/// execution slots and must serialize their own access.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Insert or replace a task. Assigns an id to unpersisted tasks
    /// (`task.id == 0`), writes it back into `task` and returns it.
    async fn save_task(&self, task: &mut Task) -> Result<TaskId, SchedulerError>;

    /// All tasks whose status is one of `statuses`.
    async fn get_tasks_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<Task>, SchedulerError>;

    /// Look a task up by id.
    async fn get_task_by_id(&self, id: TaskId) -> Result<Option<Task>, SchedulerError>;

    /// Change a stored task's status, honouring the lifecycle rules.
    ///
    /// Unknown ids are ignored.
    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), SchedulerError>;

    /// Remove a task, returning it if it existed.
    async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError>;

    /// Every stored task.
    async fn get_all_tasks(&self) -> Result<Vec<Task>, SchedulerError>;
}
