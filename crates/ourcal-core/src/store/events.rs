//! Event queries

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::CalendarStore;
use super::users::load_user;
use crate::event::datetime::{from_storage, to_storage};
use crate::event::{Event, EventPatch, EventType, NewEvent};
use crate::{Error, Result};

const EVENT_COLUMNS: &str =
    "id, title, description, event_type, start_date, end_date, user_id, applies_to_both";

impl CalendarStore {
    /// List all events ordered by start date
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events ORDER BY start_date ASC, id ASC",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Load an event by id
    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        load_event(&self.conn, id)
    }

    /// Count stored events
    pub fn count_events(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert a validated event; the owner must exist
    pub fn create_event(&mut self, event: &NewEvent) -> Result<Event> {
        let tx = self.conn.transaction()?;

        if load_user(&tx, event.user_id)?.is_none() {
            return Err(Error::UserNotFound);
        }

        tx.execute(
            "INSERT INTO events (title, description, event_type, start_date, end_date, user_id, applies_to_both)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.title,
                event.description,
                event.event_type.as_str(),
                to_storage(&event.start_date),
                to_storage(&event.end_date),
                event.user_id,
                event.applies_to_both,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = load_event(&tx, id)?
            .ok_or_else(|| Error::Other(format!("Event {} vanished after insert", id)))?;

        tx.commit()?;
        debug!("Created event {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Apply a partial update to an existing event
    pub fn update_event(&mut self, id: i64, patch: &EventPatch) -> Result<Event> {
        let tx = self.conn.transaction()?;

        let mut event = load_event(&tx, id)?.ok_or(Error::EventNotFound)?;

        if let Some(user_id) = patch.user_id {
            if load_user(&tx, user_id)?.is_none() {
                return Err(Error::UserNotFound);
            }
        }

        patch.apply_to(&mut event);

        tx.execute(
            "UPDATE events
             SET title = ?1, description = ?2, event_type = ?3, start_date = ?4,
                 end_date = ?5, user_id = ?6, applies_to_both = ?7
             WHERE id = ?8",
            params![
                event.title,
                event.description,
                event.event_type.as_str(),
                to_storage(&event.start_date),
                to_storage(&event.end_date),
                event.user_id,
                event.applies_to_both,
                event.id,
            ],
        )?;

        tx.commit()?;
        debug!("Updated event {}", event.id);
        Ok(event)
    }

    /// Delete an event
    pub fn delete_event(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let affected = tx.execute("DELETE FROM events WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(Error::EventNotFound);
        }
        tx.commit()?;
        debug!("Deleted event {}", id);
        Ok(())
    }
}

fn load_event(conn: &Connection, id: i64) -> Result<Option<Event>> {
    let event = conn
        .query_row(
            &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
            params![id],
            row_to_event,
        )
        .optional()?;
    Ok(event)
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    let event_type: String = row.get(3)?;
    let event_type = event_type
        .parse::<EventType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        event_type,
        start_date: timestamp_column(row, 4)?,
        end_date: timestamp_column(row, 5)?,
        user_id: row.get(6)?,
        applies_to_both: row.get(7)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(idx)?;
    from_storage(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(Error::InvalidDate(format!("Corrupt timestamp in database: {}", raw))),
        )
    })
}
