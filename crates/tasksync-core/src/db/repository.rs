//! Task record store implementation

use libsql::params::Params;
use libsql::{Connection, Value};

use super::mapper::{row_to_task, task_to_row, TaskRow, TASK_COLUMNS};
use crate::error::{Error, Result};
use crate::models::{ServerId, Task};

/// Trait for task storage operations (async)
///
/// Lookups include tombstoned rows so late operations can still be
/// reconciled against them; only `list_active` filters them out.
#[allow(async_fn_in_trait)]
pub trait TaskRepository {
    /// Find a task by its server identity
    async fn find_by_server_id(&self, server_id: &ServerId) -> Result<Option<Task>>;

    /// Find a task by its client id
    async fn find_by_client_id(&self, id: &str) -> Result<Option<Task>>;

    /// Insert a new task row, failing with `ConstraintViolation` on a duplicate key
    async fn insert(&self, task: &Task) -> Result<Task>;

    /// Overwrite the mutable fields of the row holding `server_id`
    async fn update(&self, server_id: &ServerId, task: &Task) -> Result<Task>;

    /// Overwrite the mutable fields of the row with client id `id`
    async fn update_by_client_id(&self, id: &str, task: &Task) -> Result<Task>;

    /// List non-deleted tasks, newest first
    async fn list_active(&self) -> Result<Vec<Task>>;
}

/// libSQL implementation of `TaskRepository`
pub struct LibSqlTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn query_one(&self, sql: &str, key: &str) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(sql, Params::Positional(vec![Value::Text(key.to_string())]))
            .await?;

        match rows.next().await? {
            Some(row) => row_to_task(TaskRow::from_row(&row)?).map(Some),
            None => Ok(None),
        }
    }

    async fn write_fields(&self, key_column: &str, key: &str, task: &Task) -> Result<u64> {
        let row = task_to_row(task);
        let sql = format!(
            "UPDATE tasks SET title = ?, description = ?, completed = ?, updated_at = ?,
             is_deleted = ?, sync_status = ?, last_synced_at = ?
             WHERE {key_column} = ?"
        );
        let values = vec![
            row.title,
            row.description,
            row.completed,
            row.updated_at,
            row.is_deleted,
            row.sync_status,
            row.last_synced_at,
            Value::Text(key.to_string()),
        ];

        Ok(self.conn.execute(&sql, Params::Positional(values)).await?)
    }
}

impl TaskRepository for LibSqlTaskRepository<'_> {
    async fn find_by_server_id(&self, server_id: &ServerId) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE server_id = ?");
        self.query_one(&sql, server_id.as_str()).await
    }

    async fn find_by_client_id(&self, id: &str) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        self.query_one(&sql, id).await
    }

    async fn insert(&self, task: &Task) -> Result<Task> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        self.conn
            .execute(&sql, Params::Positional(task_to_row(task).into_values()))
            .await
            .map_err(Error::from_insert)?;

        tracing::debug!(id = %task.id, "Inserted task row");

        self.find_by_client_id(&task.id)
            .await?
            .ok_or_else(|| Error::NotFound(task.id.clone()))
    }

    async fn update(&self, server_id: &ServerId, task: &Task) -> Result<Task> {
        if self.write_fields("server_id", server_id.as_str(), task).await? == 0 {
            return Err(Error::NotFound(server_id.to_string()));
        }

        self.find_by_server_id(server_id)
            .await?
            .ok_or_else(|| Error::NotFound(server_id.to_string()))
    }

    async fn update_by_client_id(&self, id: &str, task: &Task) -> Result<Task> {
        if self.write_fields("id", id, task).await? == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.find_by_client_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn list_active(&self) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE is_deleted = 0 ORDER BY created_at DESC"
        );
        let mut rows = self.conn.query(&sql, ()).await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(TaskRow::from_row(&row)?)?);
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::SyncStatus;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn synced_task(id: &str, title: &str) -> Task {
        let mut task = Task::new(id, title);
        task.server_id = Some(ServerId::generate());
        task.mark_synced(Utc::now());
        task
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_find() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let task = synced_task("c1", "Buy milk");
        let stored = repo.insert(&task).await.unwrap();
        assert_eq!(stored, task);

        let server_id = task.server_id.clone().unwrap();
        let by_server = repo.find_by_server_id(&server_id).await.unwrap();
        assert_eq!(by_server.as_ref().map(|t| t.id.as_str()), Some("c1"));

        let by_client = repo.find_by_client_id("c1").await.unwrap();
        assert_eq!(by_client, by_server);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_missing_returns_none() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        assert!(repo.find_by_client_id("nope").await.unwrap().is_none());
        assert!(repo
            .find_by_server_id(&ServerId::from("nope"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_duplicate_is_constraint_violation() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        repo.insert(&synced_task("c1", "A")).await.unwrap();
        let err = repo.insert(&synced_task("c1", "B")).await.unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)), "{err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_by_server_id() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let mut task = repo.insert(&synced_task("c1", "A")).await.unwrap();
        let server_id = task.server_id.clone().unwrap();
        task.title = "B".into();
        task.completed = true;
        task.updated_at += Duration::seconds(1);

        let updated = repo.update(&server_id, &task).await.unwrap();
        assert_eq!(updated.title, "B");
        assert!(updated.completed);
        assert_eq!(updated.updated_at, task.updated_at);
        assert_eq!(updated.sync_status, SyncStatus::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let task = synced_task("c1", "A");
        let err = repo
            .update(&ServerId::from("missing"), &task)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = repo.update_by_client_id("missing", &task).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tombstones_are_found_but_not_listed() {
        let db = setup().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let mut task = repo.insert(&synced_task("c1", "A")).await.unwrap();
        repo.insert(&synced_task("c2", "B")).await.unwrap();
        task.is_deleted = true;
        repo.update_by_client_id("c1", &task).await.unwrap();

        let listed = repo.list_active().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "c2");

        let tombstone = repo.find_by_client_id("c1").await.unwrap().unwrap();
        assert!(tombstone.is_deleted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_row_surfaces_error() {
        let db = setup().await;
        db.connection()
            .execute(
                "INSERT INTO tasks (id, title, created_at, updated_at) VALUES ('bad', 'A', 'not-a-date', 'not-a-date')",
                (),
            )
            .await
            .unwrap();

        let repo = LibSqlTaskRepository::new(db.connection());
        let err = repo.find_by_client_id("bad").await.unwrap_err();
        assert!(matches!(err, Error::MalformedRow(_)));
    }
}
