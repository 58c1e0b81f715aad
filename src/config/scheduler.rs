//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "TASK_SCHEDULER_";

/// Upper bound for the fetch lookahead window (one year).
const MAX_LOOKAHEAD_SECS: u64 = 365 * 24 * 60 * 60;

/// Tunable constants of the fetcher, ready queue and dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum tasks held by the ready queue (and fetched per cycle).
    pub max_queue_size: usize,
    /// Number of concurrent execution slots.
    pub max_concurrent_tasks: usize,
    /// Delay between fetch cycles in milliseconds.
    pub fetch_interval_ms: u64,
    /// Delay between dispatch cycles in milliseconds.
    pub dispatch_interval_ms: u64,
    /// How far ahead of now the fetcher looks for due tasks, in seconds.
    pub lookahead_secs: u64,
    /// Backoff after a failed loop cycle in milliseconds.
    pub retry_backoff_ms: u64,
    /// Time budget for a single store query in milliseconds.
    pub store_timeout_ms: u64,
    /// How long `dispose` waits for the loops to stop, in milliseconds.
    pub shutdown_grace_ms: u64,
    /// Optional hard limit on a task body. Unset means no limit.
    pub task_timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            max_concurrent_tasks: 10,
            fetch_interval_ms: 5_000,
            dispatch_interval_ms: 1_000,
            lookahead_secs: 300,
            retry_backoff_ms: 1_000,
            store_timeout_ms: 10_000,
            shutdown_grace_ms: 2_000,
            task_timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    /// Configuration with the reference defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ready-queue capacity.
    #[must_use]
    pub const fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set the number of execution slots.
    #[must_use]
    pub const fn with_max_concurrent_tasks(mut self, slots: usize) -> Self {
        self.max_concurrent_tasks = slots;
        self
    }

    /// Set the fetch interval.
    #[must_use]
    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval_ms = duration_ms(interval);
        self
    }

    /// Set the dispatch poll interval.
    #[must_use]
    pub fn with_dispatch_interval(mut self, interval: Duration) -> Self {
        self.dispatch_interval_ms = duration_ms(interval);
        self
    }

    /// Set the fetch lookahead window.
    #[must_use]
    pub const fn with_lookahead(mut self, window: Duration) -> Self {
        self.lookahead_secs = window.as_secs();
        self
    }

    /// Set the retry backoff.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = duration_ms(backoff);
        self
    }

    /// Set the store query budget.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the dispose grace period.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_ms = duration_ms(grace);
        self
    }

    /// Limit every task body to `timeout`, rounded up to whole seconds.
    #[must_use]
    pub const fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout_secs = match timeout {
            Some(t) if t.subsec_nanos() > 0 => Some(t.as_secs() + 1),
            Some(t) => Some(t.as_secs()),
            None => None,
        };
        self
    }

    /// Fetch interval.
    #[must_use]
    pub const fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    /// Dispatch poll interval.
    #[must_use]
    pub const fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Fetch lookahead window.
    #[must_use]
    pub const fn lookahead(&self) -> Duration {
        Duration::from_secs(self.lookahead_secs)
    }

    /// Retry backoff.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Store query budget.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Dispose grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Task body limit, if any.
    #[must_use]
    pub const fn task_timeout(&self) -> Option<Duration> {
        match self.task_timeout_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be greater than 0".into());
        }
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        if self.fetch_interval_ms == 0 {
            return Err("fetch_interval_ms must be greater than 0".into());
        }
        if self.dispatch_interval_ms == 0 {
            return Err("dispatch_interval_ms must be greater than 0".into());
        }
        if self.lookahead_secs > MAX_LOOKAHEAD_SECS {
            return Err(format!("lookahead_secs must not exceed {MAX_LOOKAHEAD_SECS}"));
        }
        if self.store_timeout_ms == 0 {
            return Err("store_timeout_ms must be greater than 0".into());
        }
        if self.task_timeout_secs == Some(0) {
            return Err("task_timeout_secs must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` (if present) and override defaults from
    /// `TASK_SCHEDULER_*` environment variables, e.g.
    /// `TASK_SCHEDULER_MAX_QUEUE_SIZE=100`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a
    /// validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`SchedulerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = read("MAX_QUEUE_SIZE") {
            cfg.max_queue_size = parse_var("MAX_QUEUE_SIZE", &v)?;
        }
        if let Some(v) = read("MAX_CONCURRENT_TASKS") {
            cfg.max_concurrent_tasks = parse_var("MAX_CONCURRENT_TASKS", &v)?;
        }
        if let Some(v) = read("FETCH_INTERVAL_MS") {
            cfg.fetch_interval_ms = parse_var("FETCH_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read("DISPATCH_INTERVAL_MS") {
            cfg.dispatch_interval_ms = parse_var("DISPATCH_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read("LOOKAHEAD_SECS") {
            cfg.lookahead_secs = parse_var("LOOKAHEAD_SECS", &v)?;
        }
        if let Some(v) = read("RETRY_BACKOFF_MS") {
            cfg.retry_backoff_ms = parse_var("RETRY_BACKOFF_MS", &v)?;
        }
        if let Some(v) = read("STORE_TIMEOUT_MS") {
            cfg.store_timeout_ms = parse_var("STORE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = read("SHUTDOWN_GRACE_MS") {
            cfg.shutdown_grace_ms = parse_var("SHUTDOWN_GRACE_MS", &v)?;
        }
        if let Some(v) = read("TASK_TIMEOUT_SECS") {
            cfg.task_timeout_secs = Some(parse_var("TASK_TIMEOUT_SECS", &v)?);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
