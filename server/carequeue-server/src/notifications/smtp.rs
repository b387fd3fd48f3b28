use async_trait::async_trait;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;

use super::{EmailMessage, Mailer, NotificationError};
use crate::config::EmailSettings;

/// SMTP delivery, one connection per message
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    settings: EmailSettings,
}

impl SmtpMailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn delivers(&self) -> bool {
        true
    }

    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let settings = &self.settings;
        let mut smtp_client = SmtpClientBuilder::new(settings.smtp_host.as_str(), settings.smtp_port)
            .implicit_tls(settings.implicit_tls);

        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            smtp_client = smtp_client.credentials((user.as_str(), pass.as_str()));
        }

        let mut client = smtp_client
            .connect()
            .await
            .map_err(|e| NotificationError::Connection(e.to_string()))?;

        let email = MessageBuilder::new()
            .from((settings.from_name.as_str(), settings.from_email.as_str()))
            .to((message.to_name.as_str(), message.to_email.as_str()))
            .subject(message.subject.as_str())
            .text_body(message.body.as_str());

        client
            .send(email)
            .await
            .map_err(|e| NotificationError::Send(e.to_string()))?;

        tracing::info!(host = %settings.smtp_host, "email sent over SMTP");
        Ok(())
    }
}
