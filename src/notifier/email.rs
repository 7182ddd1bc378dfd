use crate::config::EmailConfig;
use crate::model::NotifyError;
use crate::notifier::{AlertReport, Notifier};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| NotifyError::Delivery(format!("SMTP relay {}: {}", config.smtp_server, e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: parse_mailbox(&config.from_email)?,
            to: parse_mailbox(&config.to_email)?,
        })
    }

    fn build_message(&self, report: &AlertReport) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject())
            .multipart(MultiPart::alternative_plain_html(report.text(), report.html()))
            .map_err(|e| NotifyError::Delivery(format!("cannot build email: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e| NotifyError::Delivery(format!("invalid address '{}': {}", address, e)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, report: &AlertReport) -> Result<(), NotifyError> {
        let message = self.build_message(report)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        info!("📧 Email alert sent to {} ({} alerts)", self.to, report.alerts.len());
        Ok(())
    }
}
