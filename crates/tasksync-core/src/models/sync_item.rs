//! Sync batch envelope and per-item outcome models

use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::{ServerId, Task, TaskPatch};
use crate::error::Error;
use crate::util::compact_text;

/// Kind of client operation carried by a batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Tie-break priority; higher wins when timestamps are equal
    pub const fn priority(self) -> u8 {
        match self {
            Self::Delete => 3,
            Self::Update => 2,
            Self::Create => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client operation submitted for reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatchItem {
    /// Client id of the task this operation targets
    pub task_id: String,
    pub operation: Operation,
    /// Client view of the task, possibly partial
    #[serde(default)]
    pub data: TaskPatch,
}

impl SyncBatchItem {
    pub fn new(task_id: impl Into<String>, operation: Operation, data: TaskPatch) -> Self {
        Self {
            task_id: task_id.into(),
            operation,
            data,
        }
    }

    /// Client id used for lookup: `data.id`, falling back to `task_id`
    pub fn client_id(&self) -> &str {
        self.data
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.task_id)
    }

    /// Server id asserted by the client, if any
    pub fn asserted_server_id(&self) -> Option<&ServerId> {
        self.data
            .server_id
            .as_ref()
            .filter(|id| !id.as_str().trim().is_empty())
    }

    /// Envelope-level checks run before the item reaches reconciliation
    pub fn validate(&self) -> Result<(), Error> {
        if self.task_id.trim().is_empty() {
            return Err(Error::Validation("task_id is required".into()));
        }
        Ok(())
    }
}

/// Outcome class of one reconciled item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Client version accepted (or trivially satisfied)
    Success,
    /// Server version retained; client must adopt `resolved_data`
    Conflict,
    /// Item could not be processed
    Error,
}

/// Per-item reconciliation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub client_id: String,
    pub server_id: Option<ServerId>,
    pub status: ItemStatus,
    /// Task the server now holds
    pub resolved_data: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn success(client_id: impl Into<String>, task: Task) -> Self {
        Self {
            client_id: client_id.into(),
            server_id: task.server_id.clone(),
            status: ItemStatus::Success,
            resolved_data: Some(task),
            error: None,
        }
    }

    /// Success without any server record (delete of a task never seen)
    pub fn noop(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            server_id: None,
            status: ItemStatus::Success,
            resolved_data: None,
            error: None,
        }
    }

    pub fn conflict(client_id: impl Into<String>, server_task: Task) -> Self {
        Self {
            client_id: client_id.into(),
            server_id: server_task.server_id.clone(),
            status: ItemStatus::Conflict,
            resolved_data: Some(server_task),
            error: None,
        }
    }

    pub fn error(client_id: impl Into<String>, error: &Error) -> Self {
        Self {
            client_id: client_id.into(),
            server_id: None,
            status: ItemStatus::Error,
            resolved_data: None,
            error: Some(compact_text(&error.to_string())),
        }
    }
}
