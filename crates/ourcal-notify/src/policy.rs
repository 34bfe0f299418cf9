//! Notification policy
//!
//! Decides who, if anyone, hears about an event write. Rules come from
//! configuration; an actor name matches case-insensitively.

use ourcal_core::NotifyRule;

/// Configured notification directions
#[derive(Debug, Clone, Default)]
pub struct NotificationPolicy {
    rules: Vec<NotifyRule>,
}

impl NotificationPolicy {
    pub fn new(rules: Vec<NotifyRule>) -> Self {
        Self { rules }
    }

    /// Rule for the given acting user, if one exists
    pub fn rule_for(&self, acting_user: &str) -> Option<&NotifyRule> {
        let acting_user = acting_user.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.actor.to_lowercase() == acting_user)
    }

    pub fn should_notify(&self, acting_user: &str) -> bool {
        self.rule_for(acting_user).is_some()
    }
}
