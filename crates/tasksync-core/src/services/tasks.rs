//! Direct task CRUD on the server copy of record.

use chrono::Utc;

use crate::db::{LibSqlTaskRepository, TaskRepository};
use crate::error::{Error, Result};
use crate::models::{ServerId, Task, TaskPatch};
use crate::services::DatabaseService;
use crate::util::normalize_text_option;

/// Fields accepted when a task is created directly on the server
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct NewTask {
    /// Client-generated id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Task CRUD service. Every write counts as already synced.
#[derive(Clone)]
pub struct TaskService {
    db: DatabaseService,
}

impl TaskService {
    pub const fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Non-deleted tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let db = self.db.lock().await;
        LibSqlTaskRepository::new(db.connection())
            .list_active()
            .await
    }

    /// Fetch a non-deleted task by client id.
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        let task = LibSqlTaskRepository::new(db.connection())
            .find_by_client_id(id)
            .await?;
        Ok(task.filter(|task| !task.is_deleted))
    }

    /// Create a task with a client-generated id and a fresh server identity.
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        let title = normalize_text_option(new_task.title)
            .ok_or_else(|| Error::Validation("title is required".into()))?;
        let id = normalize_text_option(new_task.id)
            .ok_or_else(|| Error::Validation("client-generated id is required".into()))?;

        let mut task = Task::new(id, title);
        task.description = normalize_text_option(new_task.description);
        task.completed = new_task.completed.unwrap_or(false);
        task.server_id = Some(ServerId::generate());
        task.mark_synced(task.updated_at);

        let db = self.db.lock().await;
        let created = LibSqlTaskRepository::new(db.connection())
            .insert(&task)
            .await?;
        tracing::info!(id = %created.id, "Created task");
        Ok(created)
    }

    /// Apply title, description and completion changes.
    ///
    /// Returns `None` when the task does not exist. A patch without editable
    /// fields returns the stored task unchanged.
    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let Some(mut task) = repo.find_by_client_id(id).await? else {
            return Ok(None);
        };
        if !patch.has_content_changes() {
            return Ok(Some(task));
        }

        let now = Utc::now();
        let edits = TaskPatch {
            title: patch.title.clone(),
            description: patch.description.clone(),
            completed: patch.completed,
            updated_at: Some(now),
            ..TaskPatch::default()
        };
        task.apply(&edits);
        task.mark_synced(now);

        repo.update_by_client_id(id, &task).await.map(Some)
    }

    /// Soft-delete a task. Returns whether the task existed.
    pub async fn delete_task(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlTaskRepository::new(db.connection());

        let Some(mut task) = repo.find_by_client_id(id).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        task.is_deleted = true;
        task.updated_at = now;
        task.mark_synced(now);
        repo.update_by_client_id(id, &task).await?;
        tracing::info!(id, "Soft-deleted task");
        Ok(true)
    }
}
