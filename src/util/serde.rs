//! Serializable identifiers and enums shared across the scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned task identifier. Zero means "not yet persisted".
pub type TaskId = u64;

/// Identifier of an execution slot in the worker pool.
pub type WorkerId = usize;

/// Task priority, used only as a tie-break when ordering due tasks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Lowest priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Highest priority.
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(label)
    }
}

/// Position of a task in its execution lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for its due time.
    #[default]
    Pending,
    /// Held by an execution slot.
    Running,
    /// One-time task finished successfully.
    Completed,
    /// Last execution attempt raised an error.
    Failed,
}

impl TaskStatus {
    /// Statuses the fetcher considers eligible. `Running` is included so that
    /// tasks orphaned by a crash mid-execution are picked up again.
    pub const SCHEDULABLE: [Self; 2] = [Self::Pending, Self::Running];

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// `Running -> Running` is accepted for orphan recovery, and terminal
    /// states loop back to `Pending` when a recurring task is re-armed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Failed)
                | (
                    Self::Running,
                    Self::Running | Self::Pending | Self::Completed | Self::Failed
                )
                | (Self::Completed | Self::Failed, Self::Pending)
        )
    }

    /// `Completed` or `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
