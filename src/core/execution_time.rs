//! Execution-time descriptor owned by every schedulable task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SchedulerError;
use super::recurrence::{next_execution_time, RecurrencePattern};

/// When a task is due.
///
/// A one-time task is due at `once_execution_time`; a recurring task is due
/// at `next_execution_time`, which advances after every run. The interval is
/// always derived from the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionTime {
    once_execution_time: Option<DateTime<Utc>>,
    recurrence_pattern: Option<RecurrencePattern>,
    next_execution_time: Option<DateTime<Utc>>,
}

impl ExecutionTime {
    /// A task that runs once at `at`.
    #[must_use]
    pub const fn once(at: DateTime<Utc>) -> Self {
        Self {
            once_execution_time: Some(at),
            recurrence_pattern: Some(RecurrencePattern::OneTime),
            next_execution_time: None,
        }
    }

    /// A recurring task whose first run is at `first_run`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidSchedule` for `RecurrencePattern::OneTime`.
    pub fn recurring(
        pattern: RecurrencePattern,
        first_run: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        if !pattern.is_recurring() {
            return Err(SchedulerError::InvalidSchedule(
                "one-time pattern requires a once execution time".into(),
            ));
        }
        Ok(Self {
            once_execution_time: None,
            recurrence_pattern: Some(pattern),
            next_execution_time: Some(first_run),
        })
    }

    /// A recurring task whose first run is one interval after `now`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidSchedule` for `RecurrencePattern::OneTime`.
    pub fn recurring_from(
        pattern: RecurrencePattern,
        now: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let first_run = next_execution_time(pattern, None, now).ok_or_else(|| {
            SchedulerError::InvalidSchedule("one-time pattern has no interval".into())
        })?;
        Self::recurring(pattern, first_run)
    }

    /// The pattern, treating an unset pattern as one-time.
    #[must_use]
    pub fn pattern(&self) -> RecurrencePattern {
        self.recurrence_pattern.unwrap_or_default()
    }

    /// Whether the task repeats.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.pattern().is_recurring()
    }

    /// Interval in minutes derived from the pattern.
    #[must_use]
    pub fn interval_in_minutes(&self) -> Option<i64> {
        self.pattern().interval_minutes()
    }

    /// Absolute instant of a one-time run.
    #[must_use]
    pub const fn once_execution_time(&self) -> Option<DateTime<Utc>> {
        self.once_execution_time
    }

    /// Next due instant of a recurring run.
    #[must_use]
    pub const fn next_execution_time(&self) -> Option<DateTime<Utc>> {
        self.next_execution_time
    }

    /// Authoritative due instant: `next_execution_time ?? once_execution_time`.
    #[must_use]
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.next_execution_time.or(self.once_execution_time)
    }

    /// Whether the task is due at or before `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at().is_some_and(|due| due <= now)
    }

    /// Recompute `next_execution_time` after a run at `now`.
    ///
    /// Returns the new due instant, or `None` (unchanged) for one-time tasks.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = next_execution_time(self.pattern(), self.next_execution_time, now)?;
        self.next_execution_time = Some(next);
        Some(next)
    }

    /// Overwrite the next due instant of a recurring task (e.g. an external
    /// reschedule).
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidSchedule` for one-time tasks.
    pub fn reschedule(&mut self, next: DateTime<Utc>) -> Result<(), SchedulerError> {
        if !self.is_recurring() {
            return Err(SchedulerError::InvalidSchedule(
                "one-time tasks cannot be rescheduled".into(),
            ));
        }
        self.next_execution_time = Some(next);
        Ok(())
    }
}
