//! # Database State
//!
//! Wraps the `Database` handle for commands. The inner `SqlitePool` is
//! thread-safe, so commands run queries concurrently without extra locking.

use kiosk_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// ```rust,ignore
    /// let tiers = db_state.inner().price_tiers().list_active().await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
