//! Request payloads and their validation
//!
//! Payload fields are all optional so that absence can be reported per field.
//! A JSON `null` deserializes to `None` and is treated the same as absence.

use serde::Deserialize;

use crate::event::datetime::parse_timestamp;
use crate::event::types::{EventPatch, EventType, NewEvent};
use crate::{Error, Result};

/// Body of an event creation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub user_id: Option<i64>,
    pub applies_to_both: Option<bool>,
}

/// Body of an event update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub user_id: Option<i64>,
    pub applies_to_both: Option<bool>,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(Error::MissingField(field))
}

impl CreateEventRequest {
    /// Check presence, dates and event type.
    ///
    /// User existence is checked by the store inside the write transaction.
    pub fn validate(self) -> Result<NewEvent> {
        let title = required(self.title, "title")?;
        let event_type = required(self.event_type, "event_type")?;
        let start_date = required(self.start_date, "start_date")?;
        let end_date = required(self.end_date, "end_date")?;
        let user_id = required(self.user_id, "user_id")?;

        let start_date = parse_timestamp(&start_date)?;
        let end_date = parse_timestamp(&end_date)?;
        let event_type: EventType = event_type.parse()?;

        Ok(NewEvent {
            title,
            description: self.description.unwrap_or_default(),
            event_type,
            start_date,
            end_date,
            user_id,
            applies_to_both: self.applies_to_both.unwrap_or(false),
        })
    }
}

impl UpdateEventRequest {
    /// Check the fields that are present
    pub fn validate(self) -> Result<EventPatch> {
        let event_type = self
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()?;
        let start_date = self.start_date.as_deref().map(parse_timestamp).transpose()?;
        let end_date = self.end_date.as_deref().map(parse_timestamp).transpose()?;

        Ok(EventPatch {
            title: self.title,
            description: self.description,
            event_type,
            start_date,
            end_date,
            user_id: self.user_id,
            applies_to_both: self.applies_to_both,
        })
    }
}
