//! Calendar events
//!
//! Event types, request validation and timestamp handling.

pub mod datetime;
mod types;
mod validation;

pub use types::{Event, EventAction, EventPatch, EventType, NewEvent};
pub use validation::{CreateEventRequest, UpdateEventRequest};
