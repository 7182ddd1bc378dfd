// Alert delivery channels.

pub mod email;
pub mod report;
pub mod telegram;

pub use report::AlertReport;

use crate::config::AlertsConfig;
use crate::model::NotifyError;
use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, report: &AlertReport) -> Result<(), NotifyError>;
}

/// Builds the enabled channels. A channel that cannot be set up is skipped with a warning.
pub fn build_notifiers(config: &AlertsConfig) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if let Some(email) = config.email.as_ref().filter(|e| e.enabled) {
        match email::EmailNotifier::new(email) {
            Ok(n) => notifiers.push(Box::new(n)),
            Err(e) => warn!("⚠️ Email notifications disabled: {}", e),
        }
    }

    if let Some(tg) = config.telegram.as_ref().filter(|t| t.enabled) {
        match telegram::TelegramNotifier::new(tg) {
            Ok(n) => notifiers.push(Box::new(n)),
            Err(e) => warn!("⚠️ Telegram notifications disabled: {}", e),
        }
    }

    info!("🔔 {} notification channel(s) active", notifiers.len());
    notifiers
}
