//! Reconciliation of offline client operations with the server copy

mod engine;
mod resolver;

pub use engine::{reconcile_item, ReconciliationEngine};
pub use resolver::{ConflictResolver, Resolution};
