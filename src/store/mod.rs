//! Durable key-value entries shared by the response cache and the offline queue.

mod entry;
mod storage;

pub use entry::EntryStore;
pub use storage::{MemoryStorage, SqliteStorage, Storage};
