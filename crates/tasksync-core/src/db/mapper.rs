//! Translation between stored task rows and in-memory tasks
//!
//! Booleans are stored as integers and timestamps as RFC 3339 text with full
//! sub-second precision, so equal instants stay equal after a round trip.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Row, Value};

use crate::error::{Error, Result};
use crate::models::{ServerId, SyncStatus, Task};
use crate::util::normalize_text_option;

/// Column list shared by every task query, in `TaskRow` field order
pub const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at, is_deleted, sync_status, server_id, last_synced_at";

/// A task row as it is stored
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: Value,
    pub title: Value,
    pub description: Value,
    pub completed: Value,
    pub created_at: Value,
    pub updated_at: Value,
    pub is_deleted: Value,
    pub sync_status: Value,
    pub server_id: Value,
    pub last_synced_at: Value,
}

impl TaskRow {
    /// Read the raw column values of a row selected with [`TASK_COLUMNS`]
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get_value(0)?,
            title: row.get_value(1)?,
            description: row.get_value(2)?,
            completed: row.get_value(3)?,
            created_at: row.get_value(4)?,
            updated_at: row.get_value(5)?,
            is_deleted: row.get_value(6)?,
            sync_status: row.get_value(7)?,
            server_id: row.get_value(8)?,
            last_synced_at: row.get_value(9)?,
        })
    }

    /// Values in [`TASK_COLUMNS`] order, ready to bind as statement parameters
    pub fn into_values(self) -> Vec<Value> {
        vec![
            self.id,
            self.title,
            self.description,
            self.completed,
            self.created_at,
            self.updated_at,
            self.is_deleted,
            self.sync_status,
            self.server_id,
            self.last_synced_at,
        ]
    }
}

/// Coerce a stored row into a task
pub fn row_to_task(row: TaskRow) -> Result<Task> {
    let id = required_text(row.id, "id")?;
    let sync_status = match optional_text(row.sync_status, "sync_status")? {
        Some(status) => status.parse()?,
        None => SyncStatus::default(),
    };

    Ok(Task {
        id,
        server_id: optional_text(row.server_id, "server_id")?.map(ServerId::from),
        title: required_text(row.title, "title")?,
        description: optional_text(row.description, "description")?,
        completed: flag(row.completed, "completed")?,
        created_at: timestamp(row.created_at, "created_at")?,
        updated_at: timestamp(row.updated_at, "updated_at")?,
        is_deleted: flag(row.is_deleted, "is_deleted")?,
        sync_status,
        last_synced_at: optional_text(row.last_synced_at, "last_synced_at")?
            .map(|value| parse_timestamp(&value, "last_synced_at"))
            .transpose()?,
    })
}

/// Convert a task into its stored representation
pub fn task_to_row(task: &Task) -> TaskRow {
    TaskRow {
        id: Value::Text(task.id.clone()),
        title: Value::Text(task.title.clone()),
        description: task
            .description
            .clone()
            .and_then(|text| normalize_text_option(Some(text)))
            .map_or(Value::Null, Value::Text),
        completed: Value::Integer(i64::from(task.completed)),
        created_at: Value::Text(format_timestamp(task.created_at)),
        updated_at: Value::Text(format_timestamp(task.updated_at)),
        is_deleted: Value::Integer(i64::from(task.is_deleted)),
        sync_status: Value::Text(task.sync_status.as_str().to_string()),
        server_id: task
            .server_id
            .as_ref()
            .map_or(Value::Null, |id| Value::Text(id.as_str().to_string())),
        last_synced_at: task
            .last_synced_at
            .map_or(Value::Null, |at| Value::Text(format_timestamp(at))),
    }
}

/// Stored text form of a timestamp
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a stored timestamp, accepting RFC 3339 and `SQLite`'s `CURRENT_TIMESTAMP` form
pub fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::MalformedRow(format!("{column}: invalid timestamp '{value}'")))
}

fn required_text(value: Value, column: &str) -> Result<String> {
    optional_text(value, column)?
        .ok_or_else(|| Error::MalformedRow(format!("{column}: missing value")))
}

fn optional_text(value: Value, column: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(normalize_text_option(Some(text))),
        Value::Integer(number) => Ok(Some(number.to_string())),
        other => Err(Error::MalformedRow(format!(
            "{column}: expected text, found {other:?}"
        ))),
    }
}

fn flag(value: Value, column: &str) -> Result<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Integer(number) => Ok(number != 0),
        Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(Error::MalformedRow(format!(
                "{column}: expected boolean, found '{other}'"
            ))),
        },
        other => Err(Error::MalformedRow(format!(
            "{column}: expected boolean, found {other:?}"
        ))),
    }
}

fn timestamp(value: Value, column: &str) -> Result<DateTime<Utc>> {
    let text = required_text(value, column)?;
    parse_timestamp(&text, column)
}
