//! Services shared by the HTTP layer

mod database;
mod tasks;

pub use database::DatabaseService;
pub use tasks::{NewTask, TaskService};
