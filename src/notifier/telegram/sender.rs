// notifier/telegram/sender.rs

use crate::model::NotifyError;
use crate::notifier::AlertReport;
use crate::notifier::telegram::TelegramNotifier;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Sends a plain text message to the configured chat.
pub async fn send_text(notifier: &TelegramNotifier, text: &str) -> Result<(), NotifyError> {
    let url = notifier.send_message_url();
    let response = match timeout(
        Duration::from_secs(10),
        notifier
            .client
            .post(&url)
            .form(&[("chat_id", notifier.chat_id.to_string()), ("text", text.to_string())])
            .send(),
    )
    .await
    {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!("❌ Telegram send() failed: {:?}", e);
            return Err(NotifyError::Delivery(format!("Send failed: {}", e)));
        }
        Err(_) => {
            warn!("⏳ Telegram send() timed out");
            return Err(NotifyError::Unreachable);
        }
    };
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ Telegram API responded [{}]: {}", status, body);
        return Err(NotifyError::Delivery(format!("Telegram API status {}", status)));
    }
    info!("✅ Telegram response [{}]", status);
    Ok(())
}

/// Sends the alert report as one message.
pub async fn send_report(notifier: &TelegramNotifier, report: &AlertReport) -> Result<(), NotifyError> {
    info!("📤 Sending Telegram alert for {} ({} alerts)", report.product, report.alerts.len());
    send_text(notifier, &report.text()).await
}
