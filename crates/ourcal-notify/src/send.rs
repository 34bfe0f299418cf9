//! Mail transports
//!
//! `LogMailer` only records messages. `SmtpMailer` delivers over SMTP and is
//! available with the `smtp` feature.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use ourcal_core::NotifyConfig;

use crate::error::Result;
use crate::message::Notification;

/// Something that can deliver a notification
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// False for transports that only record messages locally
    fn delivers_mail(&self) -> bool {
        true
    }

    /// Deliver one message
    async fn send(&self, message: &Notification) -> Result<()>;
}

/// Records messages in the log instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    fn delivers_mail(&self) -> bool {
        false
    }

    async fn send(&self, message: &Notification) -> Result<()> {
        info!(
            to = %message.to_email,
            subject = %message.subject,
            "EMAIL NOTIFICATION (not sent, no SMTP transport)\n{}",
            message.body
        );
        Ok(())
    }
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
    use tracing::info;

    use ourcal_core::SmtpConfig;

    use super::Mailer;
    use crate::error::{NotifyError, Result};
    use crate::message::Notification;

    /// SMTP transport built on lettre
    pub struct SmtpMailer {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    }

    impl SmtpMailer {
        /// Create a new SMTP mailer; port 465 uses implicit TLS, others STARTTLS
        pub fn new(config: &SmtpConfig) -> Result<Self> {
            let builder = if config.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            .map_err(|e| NotifyError::SmtpConfig(e.to_string()))?;

            let mut builder = builder.port(config.port);
            if !config.user.is_empty() {
                builder = builder.credentials(Credentials::new(
                    config.user.clone(),
                    config.pass.clone(),
                ));
            }

            let from = match &config.from_name {
                Some(name) => format!("{} <{}>", name, config.from_address),
                None => config.from_address.clone(),
            };
            let from = from
                .parse::<Mailbox>()
                .map_err(|e| NotifyError::InvalidAddress(format!("{}: {}", from, e)))?;

            Ok(Self {
                transport: builder.build(),
                from,
            })
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        fn name(&self) -> &str {
            "smtp"
        }

        async fn send(&self, message: &Notification) -> Result<()> {
            let to = format!("{} <{}>", message.to_name, message.to_email);
            let to = to
                .parse::<Mailbox>()
                .map_err(|e| NotifyError::InvalidAddress(format!("{}: {}", to, e)))?;

            let email = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(message.subject.clone())
                .header(ContentType::TEXT_PLAIN)
                .body(message.body.clone())
                .map_err(|e| NotifyError::Message(e.to_string()))?;

            self.transport
                .send(email)
                .await
                .map_err(|e| NotifyError::SmtpSend(e.to_string()))?;

            info!("Sent notification to {}", message.to_email);
            Ok(())
        }
    }
}

/// Pick the transport for the given configuration
pub fn build_mailer(config: &NotifyConfig) -> Arc<dyn Mailer> {
    let Some(smtp) = &config.smtp else {
        info!("No SMTP transport configured, notifications will be logged only");
        return Arc::new(LogMailer);
    };

    #[cfg(feature = "smtp")]
    {
        match SmtpMailer::new(smtp) {
            Ok(mailer) => {
                info!("SMTP transport configured via {}:{}", smtp.host, smtp.port);
                Arc::new(mailer)
            }
            Err(e) => {
                warn!("SMTP transport unavailable, falling back to log: {}", e);
                Arc::new(LogMailer)
            }
        }
    }

    #[cfg(not(feature = "smtp"))]
    {
        warn!(
            "SMTP host {} configured but built without the `smtp` feature, notifications will be logged only",
            smtp.host
        );
        Arc::new(LogMailer)
    }
}
