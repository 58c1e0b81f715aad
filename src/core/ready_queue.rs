//! Bounded holding area between the fetcher and the dispatcher.
//!
//! A single `parking_lot::Mutex` guards the task deque, the id → due-time
//! membership index and the set of in-flight (dispatched, still executing)
//! ids, so all three stay consistent under concurrent access.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::error::SchedulerError;
use super::task::Task;
use crate::util::serde::TaskId;

/// Outcome of [`ReadyQueue::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Task was added.
    Enqueued,
    /// A queued copy with a different due instant was replaced.
    Replaced,
    /// An identical copy is already queued.
    Duplicate,
    /// The task is currently executing.
    InFlight,
    /// Queue is at capacity.
    Full,
}

impl Offer {
    /// Whether the queue now holds the offered task.
    #[must_use]
    pub const fn accepted(self) -> bool {
        matches!(self, Self::Enqueued | Self::Replaced)
    }
}

#[derive(Default)]
struct Inner {
    tasks: VecDeque<Task>,
    members: HashMap<TaskId, Option<DateTime<Utc>>>,
    in_flight: HashSet<TaskId>,
}

impl Inner {
    fn push(&mut self, task: Task) {
        self.members.insert(task.id, task.due_at());
        self.tasks.push_back(task);
    }

    fn take(&mut self, id: TaskId) -> Option<Task> {
        self.members.remove(&id)?;
        let index = self.tasks.iter().position(|t| t.id == id)?;
        self.tasks.remove(index)
    }
}

/// Thread-safe bounded queue of tasks awaiting dispatch.
pub struct ReadyQueue {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ReadyQueue {
    /// Create a queue holding at most `capacity` tasks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                tasks: VecDeque::with_capacity(capacity.min(1024)),
                ..Inner::default()
            }),
        }
    }

    /// Enqueue a task.
    ///
    /// # Errors
    ///
    /// `SchedulerError::DuplicateTask` if the id is queued or in flight,
    /// `SchedulerError::QueueFull` at capacity.
    pub fn try_enqueue(&self, task: Task) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        if inner.members.contains_key(&task.id) || inner.in_flight.contains(&task.id) {
            return Err(SchedulerError::DuplicateTask(task.id));
        }
        if inner.tasks.len() >= self.capacity {
            return Err(SchedulerError::QueueFull(format!(
                "ready queue holds {} tasks",
                self.capacity
            )));
        }
        inner.push(task);
        Ok(())
    }

    /// Fetcher admission: skip identical or in-flight copies, replace stale
    /// ones, and refuse new ids at capacity.
    pub fn offer(&self, task: Task) -> Offer {
        let mut inner = self.inner.lock();
        if inner.in_flight.contains(&task.id) {
            return Offer::InFlight;
        }
        if let Some(queued_due) = inner.members.get(&task.id).copied() {
            if queued_due == task.due_at() {
                return Offer::Duplicate;
            }
            inner.take(task.id);
            inner.push(task);
            return Offer::Replaced;
        }
        if inner.tasks.len() >= self.capacity {
            return Offer::Full;
        }
        inner.push(task);
        Offer::Enqueued
    }

    /// Pop the head of the queue, dropping its membership. Non-blocking.
    pub fn try_dequeue(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.pop_front()?;
        inner.members.remove(&task.id);
        Some(task)
    }

    /// Dequeue the first task due at `now` and mark it in flight.
    ///
    /// Examines each queued task at most once; tasks that are not yet due go
    /// back to the tail unchanged.
    pub fn pop_due(&self, now: DateTime<Utc>) -> Option<Task> {
        let mut inner = self.inner.lock();
        for _ in 0..inner.tasks.len() {
            let task = inner.tasks.pop_front()?;
            if task.is_due(now) {
                inner.members.remove(&task.id);
                inner.in_flight.insert(task.id);
                return Some(task);
            }
            inner.tasks.push_back(task);
        }
        None
    }

    /// Clear the in-flight mark once a task's execution has been persisted.
    pub fn release(&self, id: TaskId) -> bool {
        self.inner.lock().in_flight.remove(&id)
    }

    /// Whether `id` is queued.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.inner.lock().members.contains_key(&id)
    }

    /// Whether `id` is executing.
    #[must_use]
    pub fn is_in_flight(&self, id: TaskId) -> bool {
        self.inner.lock().in_flight.contains(&id)
    }

    /// Due instant of the queued copy of `id`.
    #[must_use]
    pub fn queued_due_at(&self, id: TaskId) -> Option<DateTime<Utc>> {
        self.inner.lock().members.get(&id).copied().flatten()
    }

    /// Remove a queued task by id.
    pub fn remove(&self, id: TaskId) -> Option<Task> {
        self.inner.lock().take(id)
    }

    /// Drop every queued task whose id is not in `live`. Returns the number
    /// evicted.
    pub fn retain_ids(&self, live: &HashSet<TaskId>) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|t| live.contains(&t.id));
        inner.members.retain(|id, _| live.contains(id));
        before - inner.tasks.len()
    }

    /// Queued task count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }

    /// Whether the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.lock().tasks.len() >= self.capacity
    }

    /// Maximum queued tasks.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of in-flight tasks.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    /// Drop all queued tasks and in-flight marks.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.tasks.clear();
        inner.members.clear();
        inner.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::core::execution_time::ExecutionTime;
    use crate::core::task::TaskKind;
    use crate::util::serde::Priority;

    fn make_task(id: TaskId, due: DateTime<Utc>) -> Task {
        let mut task = Task::new(
            format!("task-{id}"),
            Priority::Medium,
            ExecutionTime::once(due),
            TaskKind::FolderWatcher {
                folder_directory: "/tmp".into(),
            },
        );
        task.id = id;
        task
    }

    #[test]
    fn test_offer_duplicate_and_replace() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();

        assert_eq!(q.offer(make_task(1, now)), Offer::Enqueued);
        assert_eq!(q.offer(make_task(1, now)), Offer::Duplicate);
        assert_eq!(q.len(), 1);

        let later = now + Duration::minutes(1);
        assert_eq!(q.offer(make_task(1, later)), Offer::Replaced);
        assert_eq!(q.len(), 1);
        assert_eq!(q.queued_due_at(1), Some(later));
    }

    #[test]
    fn test_replace_keeps_other_tasks() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();
        q.offer(make_task(1, now));
        q.offer(make_task(2, now));
        q.offer(make_task(3, now));

        q.offer(make_task(2, now + Duration::seconds(30)));

        assert_eq!(q.len(), 3);
        assert!(q.contains(1) && q.contains(2) && q.contains(3));
    }

    #[test]
    fn test_capacity_back_pressure() {
        let q = ReadyQueue::new(2);
        let now = Utc::now();
        assert_eq!(q.offer(make_task(1, now)), Offer::Enqueued);
        assert_eq!(q.offer(make_task(2, now)), Offer::Enqueued);
        assert!(q.is_full());
        assert_eq!(q.offer(make_task(3, now)), Offer::Full);
        assert!(matches!(
            q.try_enqueue(make_task(4, now)),
            Err(SchedulerError::QueueFull(_))
        ));
        // Replacing an existing entry is still allowed when full.
        assert_eq!(q.offer(make_task(2, now + Duration::seconds(1))), Offer::Replaced);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_pop_due_skips_future_tasks() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();
        q.offer(make_task(1, now + Duration::minutes(5)));
        q.offer(make_task(2, now - Duration::seconds(1)));
        q.offer(make_task(3, now + Duration::minutes(1)));

        let due = q.pop_due(now).unwrap();
        assert_eq!(due.id, 2);
        assert!(q.is_in_flight(2));
        assert!(!q.contains(2));

        assert!(q.pop_due(now).is_none());
        assert_eq!(q.len(), 2);
        assert!(q.contains(1) && q.contains(3));
    }

    #[test]
    fn test_in_flight_blocks_requeue_until_released() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();
        q.offer(make_task(7, now));
        let task = q.pop_due(now).unwrap();

        assert_eq!(q.offer(task.clone()), Offer::InFlight);
        assert!(matches!(
            q.try_enqueue(task.clone()),
            Err(SchedulerError::DuplicateTask(7))
        ));

        assert!(q.release(7));
        assert!(!q.release(7));
        assert_eq!(q.offer(task), Offer::Enqueued);
    }

    #[test]
    fn test_try_dequeue_and_remove() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();
        assert!(q.try_dequeue().is_none());

        q.offer(make_task(1, now));
        q.offer(make_task(2, now));
        assert_eq!(q.try_dequeue().unwrap().id, 1);
        assert!(!q.contains(1));

        assert_eq!(q.remove(2).unwrap().id, 2);
        assert!(q.remove(2).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_retain_ids_evicts_vanished() {
        let q = ReadyQueue::new(10);
        let now = Utc::now();
        for id in 1..=4 {
            q.offer(make_task(id, now));
        }
        let live: HashSet<TaskId> = [1, 3].into_iter().collect();
        assert_eq!(q.retain_ids(&live), 2);
        assert!(q.contains(1) && q.contains(3));
        assert!(!q.contains(2) && !q.contains(4));
    }

    #[test]
    fn test_membership_consistent_under_contention() {
        let q = Arc::new(ReadyQueue::new(64));
        let now = Utc::now();

        std::thread::scope(|scope| {
            for producer in 0..4u64 {
                let q = Arc::clone(&q);
                scope.spawn(move || {
                    for i in 0..200u64 {
                        let _ = q.offer(make_task(producer * 1_000 + i, now));
                    }
                });
            }
            for _ in 0..2 {
                let q = Arc::clone(&q);
                scope.spawn(move || {
                    for _ in 0..400 {
                        if let Some(task) = q.pop_due(now) {
                            q.release(task.id);
                        }
                    }
                });
            }
        });

        let inner = q.inner.lock();
        assert_eq!(inner.tasks.len(), inner.members.len());
        assert!(inner.tasks.iter().all(|t| inner.members.contains_key(&t.id)));
        assert!(inner.tasks.len() <= 64);
        assert!(inner.in_flight.is_empty());
    }
}
