//! Shared database service wrapper used by the engine and task service.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::db::{Database, IN_MEMORY_PATH};
use crate::Result;

/// Thread-safe handle to the task store.
///
/// Every read-decide-write sequence runs while holding the lock, so two
/// batches can never interleave on the same row.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    ///
    /// `:memory:` selects an in-memory store.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if db_path.as_os_str() == IN_MEMORY_PATH {
            return Self::open_in_memory().await;
        }

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!("Opening task database at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem path of the database, `None` when in memory.
    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Acquire exclusive access to the database.
    pub async fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().await
    }

    /// Run `BEGIN IMMEDIATE` on the locked database.
    pub(crate) async fn begin(db: &Database) -> Result<()> {
        db.connection().execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    /// Commit, rolling back if the commit itself fails.
    pub(crate) async fn commit(db: &Database) -> Result<()> {
        if let Err(error) = db.connection().execute("COMMIT", ()).await {
            Self::rollback(db).await;
            return Err(error.into());
        }
        Ok(())
    }

    /// Roll back the open transaction, ignoring failures.
    pub(crate) async fn rollback(db: &Database) {
        if let Err(error) = db.connection().execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback failed: {error}");
        }
    }
}
