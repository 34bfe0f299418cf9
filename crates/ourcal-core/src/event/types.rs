//! Event types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind of calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Work,
    Holiday,
    Other,
}

impl EventType {
    /// Every accepted event type
    pub const ALL: [EventType; 3] = [EventType::Work, EventType::Holiday, EventType::Other];

    /// Wire and storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Holiday => "holiday",
            Self::Other => "other",
        }
    }

    /// Capitalized name for human-readable output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Holiday => "Holiday",
            Self::Other => "Other",
        }
    }

    /// Comma-separated list of accepted names
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidEventType(Self::valid_names()))
    }
}

/// A stored calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Owning user
    pub user_id: i64,
    /// Shared with both users
    pub applies_to_both: bool,
}

/// Validated fields for a new event
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub user_id: i64,
    pub applies_to_both: bool,
}

/// Validated partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
    pub applies_to_both: Option<bool>,
}

impl EventPatch {
    /// Check whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present fields into an event
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
        if let Some(user_id) = self.user_id {
            event.user_id = user_id;
        }
        if let Some(applies_to_both) = self.applies_to_both {
            event.applies_to_both = applies_to_both;
        }
    }
}

/// What happened to an event, as reported in notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Created,
    Updated,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
