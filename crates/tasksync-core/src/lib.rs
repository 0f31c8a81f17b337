//! tasksync-core - Core library for tasksync
//!
//! This crate contains the task models, the libSQL record store, and the
//! reconciliation engine that merges batches of offline client operations
//! into the server's copy of record.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{BatchResult, ItemStatus, Operation, ServerId, SyncBatchItem, Task, TaskPatch};
pub use services::{DatabaseService, NewTask, TaskService};
pub use sync::ReconciliationEngine;
