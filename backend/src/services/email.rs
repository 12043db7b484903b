use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{PoolConfig, authentication::Credentials},
};
use std::time::Duration;
use tracing::{error, info};

use crate::automation::{Notification, NotificationSender};
use crate::config::SmtpConfig;
use crate::error::{AutomationError, AutomationResult};

/// Automation notifications over SMTP
#[derive(Debug, Clone)]
pub struct EmailNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl EmailNotificationSender {
    pub fn new(smtp_config: &SmtpConfig) -> Self {
        let creds = Credentials::new(smtp_config.username.clone(), smtp_config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_config.host)
            .port(smtp_config.port)
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(10))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Self {
            transport,
            from_email: smtp_config.from_email.clone(),
            from_name: smtp_config.from_name.clone(),
        }
    }

    fn build_message(&self, notification: &Notification) -> AutomationResult<Message> {
        let invalid = |e: lettre::address::AddressError| AutomationError::Notification(e.to_string());

        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(invalid)?;

        let mut builder = Message::builder()
            .from(from)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &notification.recipients {
            builder = builder.to(recipient.parse::<Mailbox>().map_err(invalid)?);
        }

        builder
            .body(notification.message.clone())
            .map_err(|e| AutomationError::Notification(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for EmailNotificationSender {
    async fn send(&self, notification: &Notification) -> AutomationResult<()> {
        let message = self.build_message(notification)?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Notification sent to {}", notification.recipients.join(", "));
                Ok(())
            }
            Err(e) => {
                error!("Failed to send notification to {}: {}", notification.recipients.join(", "), e);
                Err(AutomationError::Notification(e.to_string()))
            }
        }
    }
}

/// Logs notifications instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> AutomationResult<()> {
        info!(
            "Notification for {} (lead {:?}): {} - {}",
            notification.recipients.join(", "),
            notification.lead_id,
            notification.subject,
            notification.message
        );
        Ok(())
    }
}
