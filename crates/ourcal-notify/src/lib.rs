//! ourcal-notify: event notifications for the shared calendar
//!
//! Decides whether an event write should notify the other user, composes the
//! message and delivers it on a background worker so request handling never
//! waits for a mail transport.

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod policy;
pub mod send;

pub use dispatcher::{DeliveryOutcome, DispatchDecision, DispatcherHandle, NotificationDispatcher};
pub use error::{NotifyError, Result};
pub use message::Notification;
pub use policy::NotificationPolicy;
pub use send::{LogMailer, Mailer, build_mailer};

#[cfg(feature = "smtp")]
pub use send::SmtpMailer;
