//! Tests for utility types

use chrono::{Duration, Utc};
use prometheus_task_scheduler::util::{
    init_tracing, Clock, ManualClock, Priority, SystemClock, TaskId, TaskStatus,
};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_status_lifecycle() {
    assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
    assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
    assert!(TaskStatus::Running.can_transition_to(TaskStatus::Pending));
    assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
    assert!(TaskStatus::Completed.is_terminal());
    assert!(!TaskStatus::Pending.is_terminal());
}

#[test]
fn test_status_serde_names() {
    let json = serde_json::to_string(&TaskStatus::Running).unwrap();
    let back: TaskStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back, TaskStatus::Running);
}

#[test]
fn test_clocks() {
    let start = Utc::now();
    let manual = ManualClock::new(start);
    manual.advance(Duration::hours(1));
    assert_eq!(manual.now() - start, Duration::hours(1));

    assert!(SystemClock.now() >= start);
}

#[test]
fn test_task_id() {
    let id: TaskId = 12345;
    assert_eq!(id, 12345);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(task_id = 1_u64, "tracing initialised");
}
