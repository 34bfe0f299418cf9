//! User queries

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::CalendarStore;
use crate::Result;
use crate::user::User;

impl CalendarStore {
    /// List all users ordered by id
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Load a user by id
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        load_user(&self.conn, id)
    }

    /// Find a user by name, ignoring case
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name FROM users WHERE name = ?1 COLLATE NOCASE",
                params![name],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Insert the named users that do not exist yet and return the full directory
    pub fn seed_users(&mut self, names: &[String]) -> Result<Vec<User>> {
        let tx = self.conn.transaction()?;
        for name in names {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO users (name) VALUES (?1)",
                params![name],
            )?;
            if inserted > 0 {
                info!("Seeded user: {}", name);
            }
        }
        tx.commit()?;
        self.list_users()
    }
}

/// Load a user through any connection or transaction
pub(super) fn load_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()?;
    Ok(user)
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
