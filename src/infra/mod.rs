//! Infrastructure adapters: task store backends and notifiers.

pub mod notify;
pub mod store;

pub use notify::{BroadcastNotifier, TaskSubscription};
pub use store::{InMemoryTaskStore, JsonFileTaskStore};
