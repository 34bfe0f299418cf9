//! Notification dispatcher
//!
//! Event writes are turned into [`Notification`]s and pushed onto a bounded
//! queue. A single worker task drains the queue and hands each message to the
//! configured [`Mailer`]. Delivery is at-most-once: failures are logged and
//! never retried, and nothing is reported back to the caller.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ourcal_core::{EventChange, NotifyConfig};

use crate::message::Notification;
use crate::policy::NotificationPolicy;
use crate::send::{Mailer, build_mailer};

/// Result of handing an event write to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Queued for delivery
    Scheduled,
    /// The policy does not notify for this user
    Skipped,
    /// Queue full, closed, or notifications disabled
    Dropped,
}

/// Terminal state of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DegradedLogged,
}

/// Cheap, cloneable front end of the notification queue
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: Option<mpsc::Sender<Notification>>,
    policy: Arc<NotificationPolicy>,
    calendar_url: Option<Arc<str>>,
}

/// Owns the worker task.
///
/// Dropping the handle without calling [`DispatcherHandle::shutdown`] also stops
/// the worker once the queue is drained.
pub struct DispatcherHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop accepting notifications, deliver what is queued, and wait for the worker
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            error!("Notification worker ended abnormally: {}", e);
        }
    }
}

impl NotificationDispatcher {
    /// Start a dispatcher from configuration
    pub fn from_config(config: &NotifyConfig) -> (Self, Option<DispatcherHandle>) {
        if !config.enabled {
            info!("Notifications are disabled");
            return (Self::disabled(), None);
        }

        let (dispatcher, handle) = Self::start(
            NotificationPolicy::new(config.rules.clone()),
            build_mailer(config),
            config.queue_capacity,
        );
        let dispatcher = dispatcher.with_calendar_url(config.calendar_url.clone());
        (dispatcher, Some(handle))
    }

    /// Spawn the delivery worker
    pub fn start(
        policy: NotificationPolicy,
        mailer: Arc<dyn Mailer>,
        capacity: usize,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        info!("Notification worker started (transport: {})", mailer.name());
        let handle = tokio::spawn(run_worker(rx, shutdown_rx, mailer));

        let dispatcher = Self {
            tx: Some(tx),
            policy: Arc::new(policy),
            calendar_url: None,
        };
        (
            dispatcher,
            DispatcherHandle {
                shutdown_tx,
                handle,
            },
        )
    }

    /// A dispatcher that never sends anything
    pub fn disabled() -> Self {
        Self {
            tx: None,
            policy: Arc::new(NotificationPolicy::default()),
            calendar_url: None,
        }
    }

    /// Link appended to every message
    pub fn with_calendar_url(mut self, url: Option<String>) -> Self {
        self.calendar_url = url.map(Arc::from);
        self
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// Queue a notification for an event write without waiting for delivery
    pub fn dispatch(&self, change: &EventChange) -> DispatchDecision {
        let Some(tx) = &self.tx else {
            return DispatchDecision::Dropped;
        };

        let Some(rule) = self.policy.rule_for(&change.owner.name) else {
            debug!(
                "No notification for event {} {} by {}",
                change.event.id, change.action, change.owner.name
            );
            return DispatchDecision::Skipped;
        };

        let notification = Notification::compose(change, rule, self.calendar_url.as_deref());
        match tx.try_send(notification) {
            Ok(()) => {
                info!(
                    "Notification scheduled for {} (event {} {} by {})",
                    rule.recipient, change.event.id, change.action, change.owner.name
                );
                DispatchDecision::Scheduled
            }
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("Notification queue full, dropping: {}", dropped.subject);
                DispatchDecision::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!("Notification worker stopped, dropping: {}", dropped.subject);
                DispatchDecision::Dropped
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Notification>,
    mut shutdown_rx: broadcast::Receiver<()>,
    mailer: Arc<dyn Mailer>,
) {
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(notification) => {
                    deliver(Arc::clone(&mailer), notification).await;
                }
                None => break,
            },
            _ = shutdown_rx.recv() => {
                rx.close();
                while let Some(notification) = rx.recv().await {
                    deliver(Arc::clone(&mailer), notification).await;
                }
                break;
            }
        }
    }
    info!("Notification worker stopped");
}

/// Make one delivery attempt.
///
/// The transport runs in its own task so a panic inside it is contained.
pub(crate) async fn deliver(mailer: Arc<dyn Mailer>, notification: Notification) -> DeliveryOutcome {
    debug!("Attempting notification delivery: {}", notification.subject);

    let attempt = {
        let mailer = Arc::clone(&mailer);
        let notification = notification.clone();
        tokio::spawn(async move { mailer.send(&notification).await })
    };

    let failure = match attempt.await {
        Ok(Ok(())) if mailer.delivers_mail() => {
            info!(
                "Notification delivered to {} via {}",
                notification.to_email,
                mailer.name()
            );
            return DeliveryOutcome::Delivered;
        }
        Ok(Ok(())) => {
            warn!(
                "No mail transport, notification for {} recorded in the log only",
                notification.to_email
            );
            return DeliveryOutcome::DegradedLogged;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("transport task failed: {}", e),
    };

    error!("Error sending email notification: {}", failure);
    warn!(
        to = %notification.to_email,
        subject = %notification.subject,
        "Undelivered notification\n{}",
        notification.body
    );
    DeliveryOutcome::DegradedLogged
}
