//! Lazily opened, resettable handle to the record store.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, SqliteSiteVisitRepository, SqliteSyncRecordRepository};
use crate::Result;

#[derive(Debug, Clone)]
enum StoreLocation {
    Path(PathBuf),
    InMemory,
}

/// Thread-safe owner of the single record store connection.
///
/// The connection is opened on first use. A failed open leaves the handle empty
/// so the next call retries, and a connection-level failure during an operation
/// drops the connection so it is rebuilt on the following call.
#[derive(Clone)]
pub struct StoreHandle {
    location: StoreLocation,
    db: Arc<Mutex<Option<Database>>>,
}

impl StoreHandle {
    /// Handle for a database file at `path`; nothing is opened yet.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::Path(path.into()),
            db: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for an in-memory database (primarily for tests).
    ///
    /// Data does not survive a reset.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            db: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle from a configured path, treating `:memory:` as in-memory.
    pub fn from_location(location: &str) -> Self {
        if location.trim() == ":memory:" {
            Self::in_memory()
        } else {
            Self::at_path(location.trim())
        }
    }

    fn open(&self) -> Result<Database> {
        match &self.location {
            StoreLocation::Path(path) => {
                tracing::info!("Opening record store at {}", path.display());
                Database::open(path)
            }
            StoreLocation::InMemory => Database::open_in_memory(),
        }
    }

    /// Open the store now, surfacing connection failures early.
    pub async fn connect(&self) -> Result<()> {
        self.with_database(|db| db.ping()).await
    }

    /// Drop the current connection; the next call reopens it.
    pub async fn reset(&self) {
        let mut guard = self.db.lock().await;
        if guard.take().is_some() {
            tracing::info!("Record store connection reset");
        }
    }

    /// Run `operation` against the open database.
    pub async fn with_database<T>(
        &self,
        operation: impl FnOnce(&Database) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.db.lock().await;
        if guard.is_none() {
            match self.open() {
                Ok(db) => *guard = Some(db),
                Err(error) => {
                    tracing::error!("Record store connection failed: {}", error);
                    return Err(error);
                }
            }
        }

        let Some(db) = guard.as_ref() else {
            return Err(crate::Error::Database(
                "record store is not initialized".to_string(),
            ));
        };

        let result = operation(db);
        if let Err(error) = &result {
            if error.is_store_failure() && db.ping().is_err() {
                tracing::warn!("Record store became unusable: {}", error);
                *guard = None;
            }
        }
        result
    }

    /// Run `operation` with the sync record repository.
    pub async fn with_records<T>(
        &self,
        operation: impl FnOnce(&SqliteSyncRecordRepository<'_>) -> Result<T>,
    ) -> Result<T> {
        self.with_database(|db| operation(&SqliteSyncRecordRepository::new(db.connection())))
            .await
    }

    /// Run `operation` with the site visit repository.
    pub async fn with_visits<T>(
        &self,
        operation: impl FnOnce(&SqliteSiteVisitRepository<'_>) -> Result<T>,
    ) -> Result<T> {
        self.with_database(|db| operation(&SqliteSiteVisitRepository::new(db.connection())))
            .await
    }

    /// Whether a connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.db.lock().await.is_some()
    }
}
