//! Configuration models for the scheduler loops and worker pool.

pub mod scheduler;

pub use scheduler::SchedulerConfig;
