//! SQLite persistence for users and events
//!
//! A single connection holds both tables. Every mutating operation runs in its
//! own transaction, which is rolled back when the operation returns an error.

mod events;
mod users;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::Result;

/// SQLite-based calendar store
pub struct CalendarStore {
    conn: Connection,
}

impl CalendarStore {
    /// Open (or create) the store at the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening calendar database at: {}", db_path);
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_tables()?;
        info!("CalendarStore initialized at {}", db_path);
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

             CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
             );

             CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                event_type TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                applies_to_both INTEGER NOT NULL DEFAULT 0
             );

             CREATE INDEX IF NOT EXISTS idx_events_start_date ON events(start_date);",
        )?;
        Ok(())
    }
}
