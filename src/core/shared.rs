//! State shared by the fetcher, the dispatcher and the facade.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::SchedulerError;
use super::notifier::Notifier;
use super::ready_queue::ReadyQueue;
use super::stats::SchedulerCounters;
use super::store::TaskStore;
use crate::util::clock::Clock;

#[derive(Clone)]
pub(crate) struct Shared {
    pub store: Arc<dyn TaskStore>,
    pub notifier: Arc<dyn Notifier>,
    pub queue: Arc<ReadyQueue>,
    pub clock: Arc<dyn Clock>,
    pub counters: Arc<SchedulerCounters>,
    pub store_timeout: Duration,
}

impl Shared {
    /// Run a store operation under the configured timeout.
    pub async fn store_call<T, F>(&self, op: &'static str, fut: F) -> Result<T, SchedulerError>
    where
        F: Future<Output = Result<T, SchedulerError>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| {
                SchedulerError::Timeout(format!("{op} exceeded {:?}", self.store_timeout))
            })?
    }
}
