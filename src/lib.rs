//! # Prometheus Task Scheduler
//!
//! A background scheduler for one-time and recurring tasks with a bounded
//! pool of concurrent execution slots.
//!
//! Two independent loops run on a tokio runtime:
//!
//! - **Fetcher**: on a fixed timer, loads tasks that are `Pending` or
//!   `Running` and due within a lookahead window from the [`TaskStore`],
//!   and fills a bounded ready queue in due order.
//! - **Dispatcher**: on a shorter timer, moves due tasks from the ready
//!   queue into free execution slots. Each slot runs the task body, records
//!   the outcome, advances recurring tasks to their next occurrence and
//!   persists the result.
//!
//! Observers follow progress through a [`Notifier`]. Storage and
//! notification are traits so the core stays independent of any backend;
//! [`infra`] provides in-memory and JSON-file stores and a broadcast
//! notifier.
//!
//! ## Key Features
//!
//! - **Missed-run catch-up**: overdue recurring tasks run once and resume
//!   on their interval; missed occurrences are never backfilled
//! - **No duplicate dispatch**: a task id executes in at most one slot
//! - **Back-pressure**: a full ready queue defers excess tasks to the next
//!   fetch cycle
//! - **Pause/resume**: dispatching stops while the queue keeps filling
//! - **Failure isolation**: errors, panics and timeouts in task bodies mark
//!   that task `Failed` and never stop the loops
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chrono::Utc;
//! use prometheus_task_scheduler::builders::SchedulerBuilder;
//! use prometheus_task_scheduler::core::{ExecutionTime, RecurrencePattern, Task, TaskKind};
//! use prometheus_task_scheduler::infra::{BroadcastNotifier, InMemoryTaskStore};
//! use prometheus_task_scheduler::util::serde::Priority;
//!
//! let notifier = Arc::new(BroadcastNotifier::default());
//! let scheduler = SchedulerBuilder::new()
//!     .store(Arc::new(InMemoryTaskStore::new()))
//!     .notifier(notifier.clone())
//!     .build()?;
//! scheduler.start()?;
//!
//! let backup = Task::new(
//!     "nightly backup",
//!     Priority::High,
//!     ExecutionTime::recurring_from(RecurrencePattern::Daily, Utc::now())?,
//!     TaskKind::FileBackup {
//!         source_directory: "/home".into(),
//!         target_directory: "/mnt/backup".into(),
//!     },
//! );
//! let id = scheduler.submit_task(backup).await?;
//! let mut events = notifier.subscribe_task(id)?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}: {}", event.update, event.task.status());
//! }
//!
//! scheduler.dispose().await;
//! ```
//!
//! [`TaskStore`]: core::TaskStore
//! [`Notifier`]: core::Notifier

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task model, recurrence, ready queue, fetcher, dispatcher and facade.
pub mod core;
/// Scheduler configuration.
pub mod config;
/// Builders to assemble a scheduler from its collaborators.
pub mod builders;
/// Task store and notifier adapters.
pub mod infra;
/// Tokio runtime adapter.
pub mod runtime;
/// Shared utilities.
pub mod util;
