//! Data models for tasksync

mod sync_item;
mod task;

pub use sync_item::{BatchResult, ItemStatus, Operation, SyncBatchItem};
pub use task::{ServerId, SyncStatus, Task, TaskPatch};
