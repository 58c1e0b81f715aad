//! Tests for error types

use prometheus_task_scheduler::core::SchedulerError;
use prometheus_task_scheduler::util::TaskStatus;

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("ready queue holds 50 tasks".to_string());
    assert_eq!(format!("{err}"), "queue full: ready queue holds 50 tasks");
}

#[test]
fn test_duplicate_task_error() {
    let err = SchedulerError::DuplicateTask(42);
    assert_eq!(format!("{err}"), "task 42 is already queued");
}

#[test]
fn test_invalid_transition_error() {
    let err = SchedulerError::InvalidTransition {
        from: TaskStatus::Completed,
        to: TaskStatus::Running,
    };
    assert_eq!(
        format!("{err}"),
        "invalid status transition: completed -> running"
    );
}

#[test]
fn test_store_and_timeout_errors() {
    let err = SchedulerError::Store("connection refused".to_string());
    assert_eq!(format!("{err}"), "store error: connection refused");

    let err = SchedulerError::Timeout("pending task query exceeded 10s".to_string());
    assert!(format!("{err}").starts_with("timed out:"));
}

#[test]
fn test_shutdown_error() {
    assert_eq!(
        format!("{}", SchedulerError::Shutdown),
        "scheduler has been shut down"
    );
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let err: SchedulerError = io.into();
    assert!(matches!(err, SchedulerError::Io(_)));
}

#[test]
fn test_serialization_error_conversion() {
    let parse = serde_json::from_str::<u32>("nope").unwrap_err();
    let err: SchedulerError = parse.into();
    assert!(format!("{err}").starts_with("serialization error:"));
}
