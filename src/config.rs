use crate::model::ConfigError;
use crate::parser::SiteKind;
use rust_decimal::Decimal;
use scraper::Selector;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound for the random pause before each site request.
const MAX_DELAY_SECS: f64 = 600.0;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    pub title: String,
    pub price: String,
    /// Interpreted per site variant; empty means the variant defaults.
    #[serde(default)]
    pub price_fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    /// Parser variant; the site key is used when absent.
    #[serde(default)]
    pub parser: Option<SiteKind>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub selectors: SelectorConfig,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceValidation {
    pub min_price: Decimal,
    pub max_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub data_directory: PathBuf,
    #[serde(default = "default_json_filename")]
    pub json_filename: String,
    #[serde(default = "default_database_filename")]
    pub database_filename: String,
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Per-site fetch timeout in seconds.
    pub timeout: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    pub delay_between_requests: DelayConfig,
    pub price_validation: PriceValidation,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    pub percentage_drop: Decimal,
    pub absolute_drop: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    pub thresholds: Thresholds,
    /// Site name -> target price.
    #[serde(default)]
    pub target_prices: HashMap<String, Decimal>,
}

impl AlertThresholds {
    pub fn target_for(&self, site: &str) -> Option<Decimal> {
        self.target_prices.get(site).copied().filter(|t| t.is_sign_positive() && !t.is_zero())
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            thresholds: Thresholds {
                percentage_drop: Decimal::from(5),
                absolute_drop: Decimal::from(20),
            },
            target_prices: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub to_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsConfig {
    #[serde(flatten)]
    pub rules: AlertThresholds,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub product: ProductConfig,
    pub sites: BTreeMap<String, SiteConfig>,
    pub settings: Settings,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

impl AppConfig {
    /// Enabled sites paired with their resolved parser variant, in key order.
    pub fn enabled_sites(&self) -> Vec<(SiteKind, &SiteConfig)> {
        self.sites
            .iter()
            .filter(|(_, site)| site.enabled)
            .filter_map(|(key, site)| Some((site.kind(key)?, site)))
            .collect()
    }

    pub fn latest_prices_path(&self) -> PathBuf {
        self.settings.output.data_directory.join(&self.settings.output.json_filename)
    }

    pub fn database_path(&self) -> PathBuf {
        self.settings.output.data_directory.join(&self.settings.output.database_filename)
    }

    pub fn price_in_range(&self, price: Decimal) -> bool {
        let bounds = &self.settings.price_validation;
        bounds.min_price <= price && price <= bounds.max_price
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let enabled: Vec<_> = self.sites.iter().filter(|(_, s)| s.enabled).collect();
        if enabled.is_empty() {
            return Err(ConfigError::Invalid("no enabled sites".into()));
        }

        for (key, site) in enabled {
            if site.kind(key).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "site '{}' has no known parser (set \"parser\" to amazon, phoneclick or teknozone)",
                    key
                )));
            }
            let selectors = &site.selectors;
            for selector in [&selectors.title, &selectors.price]
                .into_iter()
                .chain(selectors.price_fallbacks.iter())
            {
                if Selector::parse(selector).is_err() {
                    return Err(ConfigError::Invalid(format!(
                        "site '{}': invalid selector `{}`",
                        key, selector
                    )));
                }
            }
        }

        if self.settings.timeout == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".into()));
        }

        let delay = &self.settings.delay_between_requests;
        if delay.min < 0.0 || delay.min > delay.max {
            return Err(ConfigError::Invalid(format!(
                "delay_between_requests: min {} must be >= 0 and <= max {}",
                delay.min, delay.max
            )));
        }
        if delay.max > MAX_DELAY_SECS {
            return Err(ConfigError::Invalid(format!(
                "delay_between_requests: max {} exceeds {} seconds",
                delay.max, MAX_DELAY_SECS
            )));
        }

        let bounds = &self.settings.price_validation;
        if bounds.min_price > bounds.max_price {
            return Err(ConfigError::Invalid(format!(
                "price_validation: min_price {} exceeds max_price {}",
                bounds.min_price, bounds.max_price
            )));
        }

        Ok(())
    }
}

impl SiteConfig {
    pub fn kind(&self, key: &str) -> Option<SiteKind> {
        self.parser.or_else(|| SiteKind::from_key(key))
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_json_filename() -> String {
    "latest_prices.json".into()
}

fn default_database_filename() -> String {
    "history.db".into()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".into()
}

fn default_check_interval() -> u64 {
    3600
}

fn default_smtp_port() -> u16 {
    587
}
