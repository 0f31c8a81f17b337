//! Task model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::normalize_text_option;

/// Server-assigned identity of a task, using UUID v7 (time-sortable)
///
/// Values asserted by clients are kept verbatim, so the inner value is an
/// opaque string rather than a parsed UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Mint a fresh server identity
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Sync lifecycle marker of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local change not yet accepted by the server
    Pending,
    /// Accepted by the server
    #[default]
    Synced,
    /// Last reconciliation attempt failed
    Error,
}

impl SyncStatus {
    /// Stored representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(Error::MalformedRow(format!("unknown sync_status '{other}'"))),
        }
    }
}

/// A task as held by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Client-assigned identifier
    pub id: String,
    /// Server-assigned identifier, absent until first accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ServerId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Authoritative field for conflict ordering
    pub updated_at: DateTime<Utc>,
    /// Soft delete flag; tombstones stay in the store
    pub is_deleted: bool,
    pub sync_status: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new, not yet synced task with the given client id and title
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            server_id: None,
            title: title.into(),
            description: None,
            completed: false,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        }
    }

    /// Apply the fields present in `patch`, keeping existing values otherwise.
    ///
    /// Identity fields (`id`, `server_id`) and sync bookkeeping are never
    /// taken from a patch.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = patch.title.as_deref() {
            let title = title.trim();
            if !title.is_empty() {
                self.title = title.to_string();
            }
        }
        if patch.description.is_some() {
            self.description = normalize_text_option(patch.description.clone());
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(is_deleted) = patch.is_deleted {
            self.is_deleted = is_deleted;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Mark the task as accepted by the server at `now`
    pub fn mark_synced(&mut self, now: DateTime<Utc>) {
        self.sync_status = SyncStatus::Synced;
        self.last_synced_at = Some(now);
    }
}

/// Partial client view of a task
///
/// Every field is optional; an absent field means "keep the existing value".
/// An empty `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub server_id: Option<ServerId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub sync_status: Option<SyncStatus>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Non-empty trimmed title, if present
    pub fn title(&self) -> Option<String> {
        normalize_text_option(self.title.clone())
    }

    /// Whether the patch carries any user-editable field
    pub const fn has_content_changes(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.completed.is_some()
    }

    /// Build a complete task from this patch for a first insert.
    ///
    /// `fallback_id` is used when the patch carries no `id`. Missing
    /// timestamps default to `now`.
    pub fn to_new_task(&self, fallback_id: &str, now: DateTime<Utc>) -> Result<Task, Error> {
        let title = self
            .title()
            .ok_or_else(|| Error::Validation("title is required".into()))?;
        let id = normalize_text_option(self.id.clone()).unwrap_or_else(|| fallback_id.to_string());
        let created_at = self.created_at.unwrap_or(now);

        Ok(Task {
            id,
            server_id: None,
            title,
            description: normalize_text_option(self.description.clone()),
            completed: self.completed.unwrap_or(false),
            created_at,
            updated_at: self.updated_at.unwrap_or(now),
            is_deleted: self.is_deleted.unwrap_or(false),
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        })
    }
}
