use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use crate::db::Database;
use crate::models::DailyLogEntry;

/// Per-user collection of daily log documents.
///
/// Each call is a single best-effort write or read against the backing store.
/// Implementations must make `append_food` a set union and `remove_food` an
/// exact-match set removal that silently ignores missing items and missing
/// documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every entry of `uid`, ascending by date.
    async fn query_ordered(&self, uid: &str) -> Result<Vec<DailyLogEntry>>;

    /// Merge `{date, weight}` into the day's document, creating it if absent.
    async fn merge_weight(&self, uid: &str, date: &str, weight: f64) -> Result<()>;

    async fn append_food(&self, uid: &str, date: &str, item: &str) -> Result<()>;

    async fn remove_food(&self, uid: &str, date: &str, item: &str) -> Result<()>;
}

/// Local document store on top of the SQLite [`Database`].
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Direct access for account lookups that live in the same database.
    pub fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn query_ordered(&self, uid: &str) -> Result<Vec<DailyLogEntry>> {
        self.db().list_entries(uid)
    }

    async fn merge_weight(&self, uid: &str, date: &str, weight: f64) -> Result<()> {
        self.db().merge_weight(uid, date, weight)
    }

    async fn append_food(&self, uid: &str, date: &str, item: &str) -> Result<()> {
        let added = self.db().append_food(uid, date, item)?;
        if !added {
            tracing::debug!(date, "food item already logged, union is a no-op");
        }
        Ok(())
    }

    async fn remove_food(&self, uid: &str, date: &str, item: &str) -> Result<()> {
        let removed = self.db().remove_food(uid, date, item)?;
        if !removed {
            tracing::debug!(date, "no food item matched exactly, removal is a no-op");
        }
        Ok(())
    }
}
