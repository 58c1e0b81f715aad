//! Recurrence patterns and next-execution-time calculation.
//!
//! Missed occurrences are skipped, never backfilled: whenever the previous
//! due instant lies in the past the next run is anchored to `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How often a task repeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrencePattern {
    /// Runs once at its `once_execution_time`.
    #[default]
    OneTime,
    /// Every minute.
    Minute,
    /// Every 60 minutes.
    Hourly,
    /// Every 1440 minutes.
    Daily,
    /// Every 10080 minutes.
    Weekly,
    /// Every 43200 minutes (fixed 30 days).
    Monthly,
}

impl RecurrencePattern {
    /// Interval in minutes, `None` for [`RecurrencePattern::OneTime`].
    #[must_use]
    pub const fn interval_minutes(self) -> Option<i64> {
        match self {
            Self::OneTime => None,
            Self::Minute => Some(1),
            Self::Hourly => Some(60),
            Self::Daily => Some(1_440),
            Self::Weekly => Some(10_080),
            Self::Monthly => Some(43_200),
        }
    }

    /// Interval as a duration.
    #[must_use]
    pub fn interval(self) -> Option<Duration> {
        self.interval_minutes().map(Duration::minutes)
    }

    /// Anything other than `OneTime`.
    #[must_use]
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::OneTime)
    }
}

/// Compute the next due instant for a recurring pattern.
///
/// Returns `None` for `OneTime`. Without a previous due instant the task is
/// due one interval from `now`; otherwise the result is one interval after
/// the later of `previous` and `now`, so it is always strictly after `now`.
#[must_use]
pub fn next_execution_time(
    pattern: RecurrencePattern,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let interval = pattern.interval()?;
    let anchor = previous.map_or(now, |prev| prev.max(now));
    Some(anchor + interval)
}

/// Number of whole occurrences that were skipped because `previous` lies in
/// the past: `ceil((now - previous) / interval)`, zero when not overdue.
#[must_use]
pub fn missed_occurrences(
    pattern: RecurrencePattern,
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u64 {
    let Some(interval) = pattern.interval() else {
        return 0;
    };
    let overdue = now - previous;
    if overdue <= Duration::zero() {
        return 0;
    }
    let interval_ms = interval.num_milliseconds();
    let overdue_ms = overdue.num_milliseconds();
    let missed = (overdue_ms + interval_ms - 1) / interval_ms;
    u64::try_from(missed).unwrap_or_default()
}
