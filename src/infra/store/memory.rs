//! In-memory task store for development and testing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{SchedulerError, Task, TaskStore};
use crate::util::serde::{TaskId, TaskStatus};

#[derive(Default)]
struct Tables {
    tasks: BTreeMap<TaskId, Task>,
    last_id: TaskId,
}

/// Task store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tables: Mutex<Tables>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().tasks.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.lock().tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save_task(&self, task: &mut Task) -> Result<TaskId, SchedulerError> {
        let mut tables = self.tables.lock();
        if task.id == 0 {
            tables.last_id += 1;
            task.id = tables.last_id;
        } else {
            tables.last_id = tables.last_id.max(task.id);
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(task.id)
    }

    async fn get_tasks_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<Task>, SchedulerError> {
        let tables = self.tables.lock();
        Ok(tables
            .tasks
            .values()
            .filter(|t| statuses.contains(&t.status()))
            .cloned()
            .collect())
    }

    async fn get_task_by_id(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        Ok(self.tables.lock().tasks.get(&id).cloned())
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), SchedulerError> {
        let mut tables = self.tables.lock();
        if let Some(task) = tables.tasks.get_mut(&id) {
            task.set_status(status)?;
        }
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        Ok(self.tables.lock().tasks.remove(&id))
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, SchedulerError> {
        Ok(self.tables.lock().tasks.values().cloned().collect())
    }
}
