//! Error types for ourcal-core

use thiserror::Error;

/// Main error type for ourcal-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid event type. Must be one of: {0}")]
    InvalidEventType(String),

    #[error("{0}")]
    InvalidDate(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidEventType(_)
                | Self::InvalidDate(_)
        )
    }

    /// Whether the error refers to a missing user or event
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound | Self::EventNotFound)
    }
}

/// Result type alias for ourcal-core
pub type Result<T> = std::result::Result<T, Error>;
