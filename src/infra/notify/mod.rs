//! Notifier implementations.

pub mod broadcast;

pub use broadcast::{BroadcastNotifier, TaskSubscription};
