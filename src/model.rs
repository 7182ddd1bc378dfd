// Core structs: PriceReading, Alert, LatestPrices and the error taxonomy
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One observation of a product's price at a site.
#[derive(Debug, Clone, Serialize)]
pub struct PriceReading {
    pub site: String,
    pub title: String,
    /// Price text as it appeared on the page.
    pub price_text: String,
    pub price: Decimal,
    /// Canonical display form, e.g. `€486,00`.
    pub display: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertReason {
    PercentageDrop { percent: Decimal },
    AbsoluteDrop { amount: Decimal },
    TargetReached { target: Decimal },
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::PercentageDrop { percent } => write!(f, "Drop of {:.1}%", percent.round_dp(1)),
            AlertReason::AbsoluteDrop { amount } => write!(f, "Drop of €{:.2}", amount.round_dp(2)),
            AlertReason::TargetReached { target } => write!(f, "Target price €{:.2} reached", target.round_dp(2)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub site: String,
    pub title: String,
    pub current_price: Decimal,
    pub previous_price: Decimal,
    pub price_formatted: String,
    pub url: String,
    pub reasons: Vec<AlertReason>,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn reasons_text(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

/// A single entry of the latest-prices record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestEntry {
    pub site: String,
    pub title: String,
    pub price: String,
    pub url: String,
}

impl From<&PriceReading> for LatestEntry {
    fn from(reading: &PriceReading) -> Self {
        Self {
            site: reading.site.clone(),
            title: reading.title.clone(),
            price: reading.display.clone(),
            url: reading.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestPrices {
    pub timestamp: DateTime<Utc>,
    pub product: String,
    pub prices: Vec<LatestEntry>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Status(u16),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("title not found (selector `{selector}`)")]
    TitleNotFound { selector: String },
    #[error("price not found (selector `{selector}`)")]
    PriceNotFound { selector: String },
    #[error("unparsable price: '{0}'")]
    UnparsablePrice(String),
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
}

/// Anything that aborts a single site's attempt within a cycle.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
    #[error("notification endpoint unreachable")]
    Unreachable,
}
