use crate::config::AlertThresholds;
use crate::model::{Alert, AlertReason, LatestEntry, PriceReading};
use crate::normalizer::normalize;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Decides which alert rules fire for a site's current price against its baseline.
///
/// Rules are independent and may co-fire. Nothing fires without a baseline or when either
/// price is zero. The target rule replays on every cycle while the price stays at or below
/// the target.
pub fn evaluate(
    site: &str,
    current: Decimal,
    previous: Option<Decimal>,
    thresholds: &AlertThresholds,
) -> Vec<AlertReason> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    if previous.is_zero() || current.is_zero() {
        return Vec::new();
    }

    let mut reasons = Vec::new();

    if previous > current {
        let drop = previous - current;
        let percent = drop / previous * Decimal::ONE_HUNDRED;
        if percent >= thresholds.thresholds.percentage_drop {
            reasons.push(AlertReason::PercentageDrop {
                percent: percent.round_dp(1),
            });
        }
        if drop >= thresholds.thresholds.absolute_drop {
            reasons.push(AlertReason::AbsoluteDrop {
                amount: drop.round_dp(2),
            });
        }
    }

    if let Some(target) = thresholds.target_for(site) {
        if current <= target {
            reasons.push(AlertReason::TargetReached { target });
        }
    }

    reasons
}

pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Builds an alert for `reading` when any rule fires against the stored baseline.
    pub fn check(&self, reading: &PriceReading, baseline: Option<&LatestEntry>) -> Option<Alert> {
        let previous = baseline.and_then(|entry| match normalize(&entry.price) {
            Ok(price) => Some(price.amount),
            Err(e) => {
                warn!("{}: stored baseline '{}' is unreadable: {}", reading.site, entry.price, e);
                None
            }
        });

        let reasons = evaluate(&reading.site, reading.price, previous, &self.thresholds);
        if reasons.is_empty() {
            debug!("{}: no alert rules fired", reading.site);
            return None;
        }

        Some(Alert {
            site: reading.site.clone(),
            title: reading.title.clone(),
            current_price: reading.price,
            previous_price: previous.unwrap_or_default(),
            price_formatted: reading.display.clone(),
            url: reading.url.clone(),
            reasons,
            timestamp: Utc::now(),
        })
    }
}
