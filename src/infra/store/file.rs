//! JSON-file task store.
//!
//! The whole table is kept in memory and written to disk as one snapshot
//! after every mutation. Writes go to a sibling temporary file that is then
//! renamed over the target, so a crash leaves either the old or the new
//! snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::{SchedulerError, Task, TaskStore};
use crate::util::serde::{TaskId, TaskStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    last_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

/// Task store persisted as a JSON document.
pub struct JsonFileTaskStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl JsonFileTaskStore {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Io` or `SchedulerError::Serialization` if an
    /// existing file cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), tasks = snapshot.tasks.len(), "opened task store");
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, snapshot: &Snapshot) -> Result<(), SchedulerError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn save_task(&self, task: &mut Task) -> Result<TaskId, SchedulerError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let id = if task.id == 0 {
            next.last_id + 1
        } else {
            task.id
        };
        next.last_id = next.last_id.max(id);
        let mut stored = task.clone();
        stored.id = id;
        next.tasks.insert(id, stored);
        self.flush(&next).await?;
        *state = next;
        task.id = id;
        Ok(id)
    }

    async fn get_tasks_by_status(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<Task>, SchedulerError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| statuses.contains(&t.status()))
            .cloned()
            .collect())
    }

    async fn get_task_by_id(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(&id) {
            return Ok(());
        }
        let mut next = state.clone();
        if let Some(task) = next.tasks.get_mut(&id) {
            task.set_status(status)?;
        }
        self.flush(&next).await?;
        *state = next;
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<Option<Task>, SchedulerError> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(&id) {
            return Ok(None);
        }
        let mut next = state.clone();
        let removed = next.tasks.remove(&id);
        self.flush(&next).await?;
        *state = next;
        Ok(removed)
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, SchedulerError> {
        Ok(self.state.lock().await.tasks.values().cloned().collect())
    }
}
