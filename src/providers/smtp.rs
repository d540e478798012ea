use crate::core::config::SmtpConfig;
use crate::core::notify::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Sends plain-text mail through an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    from: String,
    to: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Builds the notifier; the password comes from the environment variable
    /// named in the config.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let password = std::env::var(&config.password_env).with_context(|| {
            format!(
                "SMTP password not set: export {} to enable notifications",
                config.password_env
            )
        })?;
        Self::new(config, password)
    }

    pub fn new(config: &SmtpConfig, password: String) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("Invalid SMTP relay: {}", config.host))?
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), password))
            .build();

        Ok(Self {
            from: config.from.clone(),
            to: config.to.clone(),
            transport,
        })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.parse().context("Invalid sender address")?)
            .to(self.to.parse().context("Invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build notification message")
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.message(subject, body)?;
        debug!("Sending notification to {}", self.to);
        self.transport
            .send(message)
            .await
            .context("SMTP relay rejected the notification")?;
        Ok(())
    }
}
