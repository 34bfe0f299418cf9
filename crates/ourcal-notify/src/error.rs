//! Error types for ourcal-notify

use thiserror::Error;

/// ourcal-notify error type
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("SMTP configuration error: {0}")]
    SmtpConfig(String),

    #[error("SMTP send error: {0}")]
    SmtpSend(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Message build error: {0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, NotifyError>;
