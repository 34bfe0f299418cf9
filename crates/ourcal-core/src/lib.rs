//! ourcal-core: shared calendar core library
//!
//! Event and user types, request validation, SQLite persistence, the
//! calendar service used by the HTTP layer, and configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod service;
pub mod store;
pub mod user;

pub use config::{ApiConfig, Config, DatabaseConfig, NotifyConfig, NotifyRule, SmtpConfig, UsersConfig};
pub use error::{Error, Result};
pub use event::{CreateEventRequest, Event, EventAction, EventPatch, EventType, NewEvent, UpdateEventRequest};
pub use service::{CalendarService, EventChange};
pub use store::CalendarStore;
pub use user::User;
