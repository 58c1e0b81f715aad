//! Task store backends.

pub mod file;
pub mod memory;

pub use file::JsonFileTaskStore;
pub use memory::InMemoryTaskStore;
