//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use prometheus_task_scheduler::config::SchedulerConfig;

#[test]
fn test_defaults_match_reference_constants() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.max_queue_size, 50);
    assert_eq!(cfg.max_concurrent_tasks, 10);
    assert_eq!(cfg.fetch_interval(), Duration::from_secs(5));
    assert_eq!(cfg.dispatch_interval(), Duration::from_secs(1));
    assert_eq!(cfg.lookahead(), Duration::from_secs(300));
    assert_eq!(cfg.retry_backoff(), Duration::from_secs(1));
    assert_eq!(cfg.task_timeout(), None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_builder_setters() {
    let cfg = SchedulerConfig::new()
        .with_max_queue_size(5)
        .with_max_concurrent_tasks(2)
        .with_fetch_interval(Duration::from_millis(250))
        .with_dispatch_interval(Duration::from_millis(20))
        .with_lookahead(Duration::from_secs(60))
        .with_task_timeout(Some(Duration::from_secs(30)));
    assert_eq!(cfg.max_queue_size, 5);
    assert_eq!(cfg.max_concurrent_tasks, 2);
    assert_eq!(cfg.fetch_interval_ms, 250);
    assert_eq!(cfg.dispatch_interval(), Duration::from_millis(20));
    assert_eq!(cfg.lookahead_secs, 60);
    assert_eq!(cfg.task_timeout(), Some(Duration::from_secs(30)));
}

#[test]
fn test_sub_second_task_timeout_rounds_up() {
    let cfg = SchedulerConfig::new().with_task_timeout(Some(Duration::from_millis(500)));
    assert_eq!(cfg.task_timeout_secs, Some(1));
    assert!(cfg.validate().is_ok());

    let cfg = SchedulerConfig::new().with_task_timeout(Some(Duration::from_millis(2_001)));
    assert_eq!(cfg.task_timeout(), Some(Duration::from_secs(3)));
}

#[test]
fn test_validation_rejects_zero_sizes() {
    assert!(SchedulerConfig::default()
        .with_max_queue_size(0)
        .validate()
        .is_err());
    assert!(SchedulerConfig::default()
        .with_max_concurrent_tasks(0)
        .validate()
        .is_err());
    let cfg = SchedulerConfig {
        dispatch_interval_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().unwrap_err().contains("dispatch_interval_ms"));
}

#[test]
fn test_validation_rejects_huge_lookahead() {
    let cfg = SchedulerConfig {
        lookahead_secs: u64::MAX,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str_partial() {
    let cfg = SchedulerConfig::from_json_str(r#"{ "max_queue_size": 8, "task_timeout_secs": 12 }"#)
        .unwrap();
    assert_eq!(cfg.max_queue_size, 8);
    assert_eq!(cfg.task_timeout_secs, Some(12));
    assert_eq!(cfg.max_concurrent_tasks, 10);
}

#[test]
fn test_from_json_str_errors() {
    assert!(SchedulerConfig::from_json_str("{ not json")
        .unwrap_err()
        .starts_with("parse error"));
    assert!(SchedulerConfig::from_json_str(r#"{ "max_concurrent_tasks": 0 }"#).is_err());
}

#[test]
fn test_from_lookup_overrides() {
    let vars: HashMap<&str, &str> = [
        ("TASK_SCHEDULER_MAX_QUEUE_SIZE", "100"),
        ("TASK_SCHEDULER_FETCH_INTERVAL_MS", " 2500 "),
        ("TASK_SCHEDULER_TASK_TIMEOUT_SECS", "90"),
    ]
    .into_iter()
    .collect();
    let cfg =
        SchedulerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
    assert_eq!(cfg.max_queue_size, 100);
    assert_eq!(cfg.fetch_interval_ms, 2500);
    assert_eq!(cfg.task_timeout_secs, Some(90));
    assert_eq!(cfg.dispatch_interval_ms, 1000);
}

#[test]
fn test_from_lookup_reports_bad_variable() {
    let err = SchedulerConfig::from_lookup(|key| {
        (key == "TASK_SCHEDULER_MAX_CONCURRENT_TASKS").then(|| "ten".to_string())
    })
    .unwrap_err();
    assert!(err.contains("TASK_SCHEDULER_MAX_CONCURRENT_TASKS"));
}
