//! Fixed-size pool of execution slots.
//!
//! A tokio semaphore bounds how many task bodies run at once. Each permit is
//! paired with a stable slot id taken from a free list; the id is reported
//! as the task's `worker_id`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::SchedulerError;
use crate::util::serde::WorkerId;

/// Counting limiter for concurrent task executions.
pub struct ExecutionSlots {
    size: usize,
    permits: Arc<Semaphore>,
    free: Arc<Mutex<Vec<WorkerId>>>,
}

impl ExecutionSlots {
    /// Create `size` slots with ids `0..size`.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            free: Arc::new(Mutex::new((0..size).rev().collect())),
        }
    }

    /// Take a slot if one is free. Never waits.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        self.guard(permit)
    }

    /// Wait for a free slot.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Shutdown` once the slots are closed.
    pub async fn acquire(&self) -> Result<SlotGuard, SchedulerError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SchedulerError::Shutdown)?;
        self.guard(permit).ok_or(SchedulerError::Shutdown)
    }

    fn guard(&self, permit: OwnedSemaphorePermit) -> Option<SlotGuard> {
        let worker_id = self.free.lock().pop()?;
        Some(SlotGuard {
            worker_id,
            free: Arc::clone(&self.free),
            _permit: permit,
        })
    }

    /// Total slot count.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Slots currently held.
    #[must_use]
    pub fn active(&self) -> usize {
        self.size.saturating_sub(self.available())
    }

    /// Refuse further acquisitions. Held slots stay valid until dropped.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

/// A held execution slot; released on drop.
pub struct SlotGuard {
    worker_id: WorkerId,
    free: Arc<Mutex<Vec<WorkerId>>>,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    /// Id of the held slot.
    #[must_use]
    pub const fn worker_id(&self) -> WorkerId {
        self.worker_id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // The id goes back before the permit field is dropped, so a new
        // permit always finds a free id.
        self.free.lock().push(self.worker_id);
    }
}
