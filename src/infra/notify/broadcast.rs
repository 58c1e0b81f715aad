//! In-process notifier backed by a tokio broadcast channel.

use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::{Notifier, SchedulerError, Task, TaskUpdateEvent, TaskUpdateType};
use crate::util::serde::TaskId;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans task events out to any number of subscribers.
///
/// Sending never blocks; with no subscribers the event is dropped. After
/// [`dispose`](Self::dispose) every notification is discarded and open
/// subscriptions end.
pub struct BroadcastNotifier {
    sender: RwLock<Option<broadcast::Sender<TaskUpdateEvent>>>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Receive every event.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` once disposed.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<TaskUpdateEvent>, SchedulerError> {
        self.sender
            .read()
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(SchedulerError::Shutdown)
    }

    /// Receive only the events for task `id`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` once disposed.
    pub fn subscribe_task(&self, id: TaskId) -> Result<TaskSubscription, SchedulerError> {
        Ok(TaskSubscription {
            id,
            receiver: self.subscribe()?,
        })
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Stop delivering events. Idempotent.
    pub fn dispose(&self) {
        if self.sender.write().take().is_some() {
            tracing::debug!("broadcast notifier disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.sender.read().is_none()
    }

    fn publish(&self, task: &Task, update: TaskUpdateType) {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return;
        };
        if sender.receiver_count() == 0 {
            return;
        }
        // Errors only mean every receiver went away in the meantime.
        let _ = sender.send(TaskUpdateEvent::new(task, update));
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify_task_updated(&self, task: &Task) {
        self.publish(task, TaskUpdateType::Updated);
    }

    fn notify_status_changed(&self, task: &Task) {
        self.publish(task, TaskUpdateType::StatusChanged);
    }

    fn notify_log_added(&self, task: &Task) {
        self.publish(task, TaskUpdateType::LogAdded);
    }

    fn notify_execution_time_changed(&self, task: &Task) {
        self.publish(task, TaskUpdateType::ExecutionTimeChanged);
    }

    fn notify_task_created(&self, task: &Task) {
        self.publish(task, TaskUpdateType::Created);
    }

    fn notify_task_deleted(&self, task: &Task) {
        self.publish(task, TaskUpdateType::Deleted);
    }
}

/// Subscription filtered to a single task.
pub struct TaskSubscription {
    id: TaskId,
    receiver: broadcast::Receiver<TaskUpdateEvent>,
}

impl TaskSubscription {
    /// Task this subscription follows.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.id
    }

    /// Next event for the task, or `None` once the notifier is disposed.
    ///
    /// Events dropped because this subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<TaskUpdateEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.task.id == self.id => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(task_id = self.id, skipped, "task subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
