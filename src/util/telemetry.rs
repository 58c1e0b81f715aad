//! Default subscriber for the scheduler's tracing output.
//!
//! The fetcher and dispatcher log cycle progress at `debug`, and every task
//! execution runs inside a `task_run` span carrying `task_id`, `worker_id`
//! and `run_id`. Thread names are included so slot activity on a
//! multi-threaded runtime can be told apart. Filtering follows `RUST_LOG`.

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}
