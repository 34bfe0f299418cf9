//! Notification message composition

use chrono::{DateTime, Utc};

use ourcal_core::{EventChange, NotifyRule};

/// Human-readable timestamp format used in message bodies
const DATE_FORMAT: &str = "%B %d, %Y at %I:%M %p";

/// A fully composed notification, owned by the delivery worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Build the message for an event write matched by `rule`
    pub fn compose(change: &EventChange, rule: &NotifyRule, calendar_url: Option<&str>) -> Self {
        let event = &change.event;
        let action = change.action.as_str();

        let mut body = format!(
            "Hi {recipient}!\n\n\
             {actor} has {action} an event in your shared calendar:\n\n\
             Event Details:\n\
             - Title: {title}\n\
             - Type: {kind}\n\
             - Start: {start}\n\
             - End: {end}\n\
             - Shared: {shared}\n",
            recipient = rule.recipient,
            actor = change.owner.name,
            action = action,
            title = event.title,
            kind = event.event_type.label(),
            start = format_timestamp(&event.start_date),
            end = format_timestamp(&event.end_date),
            shared = if event.applies_to_both { "Yes" } else { "No" },
        );

        if !event.description.is_empty() {
            body.push_str(&format!("\nDescription:\n{}\n", event.description));
        }

        if let Some(url) = calendar_url {
            body.push_str(&format!(
                "\nYou can view and manage this event in your calendar at: {}\n",
                url
            ));
        }

        body.push_str("\n---\nThis is an automated notification. Please do not reply to this email.\n");

        Self {
            to_name: rule.recipient.clone(),
            to_email: rule.email.clone(),
            subject: format!("Calendar Update: {} {}", event.title, action),
            body,
        }
    }
}

/// Format a timestamp like `January 05, 2025 at 03:00 PM`
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}
