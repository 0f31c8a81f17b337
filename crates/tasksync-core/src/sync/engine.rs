//! Batch reconciliation of client operations against the task store

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::resolver::{ConflictResolver, Resolution};
use crate::db::{LibSqlTaskRepository, TaskRepository};
use crate::error::{Error, Result};
use crate::models::{BatchResult, Operation, ServerId, SyncBatchItem, Task};
use crate::services::DatabaseService;

/// Processes sync batches against an injected task store.
#[derive(Clone)]
pub struct ReconciliationEngine {
    db: DatabaseService,
}

impl ReconciliationEngine {
    pub const fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Reconcile every item in order, returning one result per item.
    ///
    /// Items run sequentially since later items may depend on mutations made
    /// by earlier ones. A failing item is reported as an `error` result and
    /// never stops the rest of the batch.
    pub async fn process_batch(&self, items: &[SyncBatchItem]) -> Vec<BatchResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.process_or_report(item).await);
        }

        tracing::info!(items = items.len(), "Processed sync batch");
        results
    }

    /// Like [`process_batch`](Self::process_batch), for items still in their
    /// submitted JSON form.
    ///
    /// An item that does not decode becomes an `error` result in its slot,
    /// keyed by its raw `task_id` when one is present.
    pub async fn process_json_batch(&self, items: Vec<Value>) -> Vec<BatchResult> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for value in items {
            let task_id = value
                .get("task_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let result = match serde_json::from_value::<SyncBatchItem>(value) {
                Ok(item) => self.process_or_report(&item).await,
                Err(error) => {
                    let error = Error::from(error);
                    tracing::warn!(
                        task_id = %task_id,
                        "Rejected undecodable batch item: {error}"
                    );
                    BatchResult::error(task_id, &error)
                }
            };
            results.push(result);
        }

        tracing::info!(items = total, "Processed sync batch");
        results
    }

    async fn process_or_report(&self, item: &SyncBatchItem) -> BatchResult {
        match self.process_item(item).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(
                    task_id = %item.task_id,
                    operation = %item.operation,
                    "Failed to reconcile batch item: {error}"
                );
                BatchResult::error(&item.task_id, &error)
            }
        }
    }

    /// Reconcile one item inside its own exclusive transaction.
    async fn process_item(&self, item: &SyncBatchItem) -> Result<BatchResult> {
        item.validate()?;

        let db = self.db.lock().await;
        DatabaseService::begin(&db).await?;

        let repo = LibSqlTaskRepository::new(db.connection());
        match reconcile_item(&repo, item, Utc::now()).await {
            Ok(result) => {
                DatabaseService::commit(&db).await?;
                Ok(result)
            }
            Err(error) => {
                DatabaseService::rollback(&db).await;
                Err(error)
            }
        }
    }
}

/// Decide and apply a single item against `repo`.
///
/// The server counterpart is looked up by the asserted `server_id` first and
/// by client id second. Without a counterpart a delete is a no-op and any
/// other operation inserts a new row. With one, the later `updated_at` wins
/// outright and an exact tie goes to [`ConflictResolver`]. A losing item
/// leaves the server row untouched.
pub async fn reconcile_item<R: TaskRepository>(
    repo: &R,
    item: &SyncBatchItem,
    now: DateTime<Utc>,
) -> Result<BatchResult> {
    let Some(server_task) = find_server_task(repo, item).await? else {
        return first_sync(repo, item, now).await;
    };

    let client_updated_at = item.data.updated_at.ok_or_else(|| {
        Error::Validation("updated_at is required to reconcile an existing task".into())
    })?;
    let client_task = client_view(&server_task, item);

    match client_updated_at.cmp(&server_task.updated_at) {
        Ordering::Greater => {
            tracing::debug!(task_id = %item.task_id, "Client version is newer");
            accept(repo, item, &server_task, client_task, now).await
        }
        Ordering::Less => {
            tracing::debug!(task_id = %item.task_id, "Server version is newer");
            Ok(BatchResult::conflict(&item.task_id, server_task))
        }
        Ordering::Equal => {
            match ConflictResolver::resolve(item.operation, client_task, &server_task) {
                Resolution::Client(task) => accept(repo, item, &server_task, task, now).await,
                Resolution::Server => Ok(BatchResult::conflict(&item.task_id, server_task)),
            }
        }
    }
}

async fn find_server_task<R: TaskRepository>(
    repo: &R,
    item: &SyncBatchItem,
) -> Result<Option<Task>> {
    if let Some(server_id) = item.asserted_server_id() {
        if let Some(task) = repo.find_by_server_id(server_id).await? {
            return Ok(Some(task));
        }
    }
    repo.find_by_client_id(item.client_id()).await
}

async fn first_sync<R: TaskRepository>(
    repo: &R,
    item: &SyncBatchItem,
    now: DateTime<Utc>,
) -> Result<BatchResult> {
    if item.operation == Operation::Delete {
        tracing::debug!(task_id = %item.task_id, "Delete of unknown task is a no-op");
        return Ok(BatchResult::noop(&item.task_id));
    }

    let mut task = item.data.to_new_task(item.client_id(), now)?;
    task.server_id = Some(ServerId::generate());
    task.mark_synced(now);

    let created = repo.insert(&task).await?;
    tracing::info!(
        task_id = %item.task_id,
        server_id = %created.server_id.as_ref().map_or("", ServerId::as_str),
        "Created task on first sync"
    );
    Ok(BatchResult::success(&item.task_id, created))
}

/// The server row as it would look with the client's operation applied
fn client_view(server_task: &Task, item: &SyncBatchItem) -> Task {
    let mut task = server_task.clone();
    task.apply(&item.data);
    if item.operation == Operation::Delete {
        task.is_deleted = true;
    }
    task
}

async fn accept<R: TaskRepository>(
    repo: &R,
    item: &SyncBatchItem,
    server_task: &Task,
    mut task: Task,
    now: DateTime<Utc>,
) -> Result<BatchResult> {
    let server_id = server_task
        .server_id
        .clone()
        .ok_or_else(|| Error::NotFound(format!("server identity for task {}", server_task.id)))?;

    task.mark_synced(now);
    let updated = repo.update(&server_id, &task).await?;
    Ok(BatchResult::success(&item.task_id, updated))
}
