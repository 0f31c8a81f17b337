//! Database layer for tasksync

mod connection;
pub mod mapper;
mod migrations;
mod repository;

pub use connection::{Database, IN_MEMORY_PATH};
pub use repository::{LibSqlTaskRepository, TaskRepository};
