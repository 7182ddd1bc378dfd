// Tracking cycle: fetch every enabled site, extract, persist, alert.
use crate::analyzer::AlertEvaluator;
use crate::config::{AppConfig, DelayConfig, SiteConfig};
use crate::model::{Alert, PriceReading, SiteError};
use crate::normalizer::normalize;
use crate::notifier::{AlertReport, Notifier};
use crate::parser::{self, SelectorProbe, SiteKind};
use crate::scraper::Fetcher;
use crate::storage::{LatestPricesFile, SqliteStorage};
use crate::utils::{save_debug_html, truncate_title};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Counters accumulated over the lifetime of the tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerMetrics {
    pub total_requests: u64,
    pub successful_scrapes: u64,
    pub failed_scrapes: u64,
    total_response_ms: u64,
}

impl TrackerMetrics {
    fn record_success(&mut self, response_ms: u64) {
        self.total_requests += 1;
        self.successful_scrapes += 1;
        self.total_response_ms += response_ms;
    }

    fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_scrapes += 1;
    }

    /// Mean response time of successful scrapes, in milliseconds.
    pub fn avg_response_time_ms(&self) -> f64 {
        if self.successful_scrapes == 0 {
            return 0.0;
        }
        self.total_response_ms as f64 / self.successful_scrapes as f64
    }
}

#[derive(Debug)]
pub struct SiteFailure {
    pub site: String,
    pub error: SiteError,
}

#[derive(Debug)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub product: String,
    pub readings: Vec<PriceReading>,
    pub failures: Vec<SiteFailure>,
    pub total_sites: usize,
    pub alerts: Vec<Alert>,
    pub elapsed: Duration,
}

impl CycleReport {
    /// A cycle succeeds when at least one site produced a reading.
    pub fn is_success(&self) -> bool {
        !self.readings.is_empty()
    }

    pub fn success_rate(&self) -> String {
        format!("{}/{}", self.readings.len(), self.total_sites)
    }
}

/// Selector diagnostic for one site.
#[derive(Debug)]
pub struct SelectorCheck {
    pub site: String,
    pub url: String,
    pub outcome: Result<SelectorMatch, SiteError>,
}

#[derive(Debug)]
pub struct SelectorMatch {
    pub page_bytes: usize,
    pub title: SelectorProbe,
    pub price: SelectorProbe,
}

pub struct PriceTracker {
    config: Arc<AppConfig>,
    fetcher: Box<dyn Fetcher>,
    storage: SqliteStorage,
    latest: LatestPricesFile,
    evaluator: AlertEvaluator,
    notifiers: Vec<Box<dyn Notifier>>,
    metrics: TrackerMetrics,
}

impl PriceTracker {
    pub fn new(
        config: Arc<AppConfig>,
        fetcher: Box<dyn Fetcher>,
        storage: SqliteStorage,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            latest: LatestPricesFile::new(config.latest_prices_path()),
            evaluator: AlertEvaluator::new(config.alerts.rules.clone()),
            config,
            fetcher,
            storage,
            notifiers,
            metrics: TrackerMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &TrackerMetrics {
        &self.metrics
    }

    /// Runs one full cycle. Per-site, storage and notification failures are logged and
    /// reported, never propagated.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let timestamp = Utc::now();
        let config = Arc::clone(&self.config);
        let product = config.product.name.clone();

        info!("🚀 Tracking cycle for {}", product);
        let mut book = self.latest.load();
        debug!("Loaded {} baseline(s) from {}", book.len(), self.latest.path().display());

        let sites = config.enabled_sites();
        let log_dir = config.settings.output.log_directory.as_path();
        let fetcher = self.fetcher.as_ref();

        info!("🔍 Scraping {} site(s)...", sites.len());
        let tasks: Vec<_> = sites
            .iter()
            .map(|(kind, site)| {
                let delay = random_delay(&config.settings.delay_between_requests);
                scrape_site(fetcher, *kind, site, delay, log_dir)
            })
            .collect();
        let results = join_all(tasks).await;

        let mut readings = Vec::new();
        let mut failures = Vec::new();
        for ((_, site), result) in sites.iter().zip(results) {
            match result {
                Ok(reading) => {
                    self.metrics.record_success(reading.response_time_ms);
                    if !config.price_in_range(reading.price) {
                        warn!(
                            "⚠️ {}: price {} outside the expected range, possible extraction error",
                            site.name, reading.display
                        );
                    }
                    info!("✅ {}: {} - {}", site.name, truncate_title(&reading.title, 50), reading.display);
                    readings.push(reading);
                }
                Err(error) => {
                    self.metrics.record_failure();
                    error!("❌ {}: {}", site.name, error);
                    failures.push(SiteFailure {
                        site: site.name.clone(),
                        error,
                    });
                }
            }
        }
        info!("📊 Successes: {}/{}", readings.len(), sites.len());

        let mut alerts = Vec::new();
        if readings.is_empty() {
            warn!("⚠️ No prices collected in this cycle");
        } else {
            if let Err(e) = self.storage.append_history(&readings, timestamp) {
                warn!("History save failed: {}", e);
            }

            alerts = readings
                .iter()
                .filter_map(|reading| self.evaluator.check(reading, book.baseline(&reading.site)))
                .collect();

            if !alerts.is_empty() {
                info!("🚨 {} alert(s) triggered", alerts.len());
                if let Err(e) = self.storage.append_alerts(&alerts) {
                    warn!("Alert log save failed: {}", e);
                }
                self.notify(&AlertReport::new(&product, alerts.clone())).await;
            }

            book.record(&readings);
            match self.latest.save(&book.to_latest(&product, timestamp)) {
                Ok(()) => info!("💾 Latest prices saved to {}", self.latest.path().display()),
                Err(e) => warn!("Latest prices save failed: {}", e),
            }
        }

        let report = CycleReport {
            timestamp,
            product,
            readings,
            failures,
            total_sites: sites.len(),
            alerts,
            elapsed: started.elapsed(),
        };
        info!(
            "⏱️ Cycle finished in {:.2}s ({} prices)",
            report.elapsed.as_secs_f64(),
            report.success_rate()
        );
        report
    }

    async fn notify(&self, report: &AlertReport) {
        if self.notifiers.is_empty() {
            debug!("No notification channel enabled");
            return;
        }
        for notifier in &self.notifiers {
            match notifier.notify(report).await {
                Ok(()) => info!("Alert delivered via {}", notifier.name()),
                Err(e) => warn!("❌ {} notification failed: {}", notifier.name(), e),
            }
        }
    }

    /// Fetches every enabled site and reports how its title and price selectors match.
    pub async fn check_selectors(&self) -> Vec<SelectorCheck> {
        let sites = self.config.enabled_sites();
        let fetcher = self.fetcher.as_ref();
        let tasks = sites.iter().map(|(_, site)| async move {
            let outcome = match fetcher.fetch(site).await {
                Ok(html) => parser::probe(&html, &site.selectors)
                    .map(|(title, price)| SelectorMatch {
                        page_bytes: html.len(),
                        title,
                        price,
                    })
                    .map_err(SiteError::from),
                Err(e) => Err(SiteError::from(e)),
            };
            SelectorCheck {
                site: site.name.clone(),
                url: site.url.clone(),
                outcome,
            }
        });
        join_all(tasks).await
    }
}

/// Uniform delay in `[min, max]` seconds.
fn random_delay(delay: &DelayConfig) -> Duration {
    if delay.max <= 0.0 {
        return Duration::ZERO;
    }
    let secs = if delay.min >= delay.max {
        delay.max
    } else {
        rand::rng().random_range(delay.min..=delay.max)
    };
    Duration::from_secs_f64(secs)
}

async fn scrape_site(
    fetcher: &dyn Fetcher,
    kind: SiteKind,
    site: &SiteConfig,
    delay: Duration,
    log_dir: &Path,
) -> Result<PriceReading, SiteError> {
    if !delay.is_zero() {
        debug!("{}: waiting {:.2}s", site.name, delay.as_secs_f64());
        sleep(delay).await;
    }

    let started = Instant::now();
    let html = fetcher.fetch(site).await?;
    let response_time_ms = started.elapsed().as_millis() as u64;

    let parsed = parser::extract(&html, kind, &site.selectors)
        .and_then(|extracted| normalize(&extracted.price_text).map(|price| (extracted, price)));
    let (extracted, price) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            save_debug_html(log_dir, &site.name, &html);
            return Err(e.into());
        }
    };

    Ok(PriceReading {
        site: site.name.clone(),
        title: extracted.title,
        price_text: extracted.price_text,
        price: price.amount,
        display: price.display,
        url: site.url.clone(),
        fetched_at: Utc::now(),
        response_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::config::tests::SAMPLE;
    use crate::model::{AlertReason, ExtractError, FetchError, NotifyError};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const AMAZON_URL: &str = "https://www.amazon.it/dp/B0C78GHQRJ";
    const PHONECLICK_URL: &str = "https://www.phoneclick.it/galaxy-s23";

    /// Serves canned pages by URL; a missing URL answers 404.
    #[derive(Clone, Default)]
    struct StubFetcher {
        pages: Arc<Mutex<HashMap<String, String>>>,
    }

    impl StubFetcher {
        fn set(&self, url: &str, html: String) {
            self.pages.lock().unwrap().insert(url.to_string(), html);
        }

        fn remove(&self, url: &str) {
            self.pages.lock().unwrap().remove(url);
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, site: &SiteConfig) -> Result<String, FetchError> {
            self.pages
                .lock()
                .unwrap()
                .get(&site.url)
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        subjects: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, report: &AlertReport) -> Result<(), NotifyError> {
            self.subjects.lock().unwrap().push(report.subject());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn notify(&self, _report: &AlertReport) -> Result<(), NotifyError> {
            Err(NotifyError::Unreachable)
        }
    }

    fn amazon_page(price: &str) -> String {
        format!(
            r#"<span id="productTitle"> Samsung Galaxy S23 256GB </span>
               <span class="a-price"><span class="a-offscreen">{}</span></span>"#,
            price
        )
    }

    fn phoneclick_page(price: &str) -> String {
        format!(
            r#"<h1 class="caratteretitolo">Galaxy S23 256GB</h1>
               <p class="price"><del>€599,00</del> <ins>{}</ins></p>"#,
            price
        )
    }

    fn config(dir: &TempDir) -> Arc<AppConfig> {
        let mut config = parse_config(SAMPLE).unwrap();
        config.settings.delay_between_requests = DelayConfig { min: 0.0, max: 0.0 };
        config.settings.output.data_directory = dir.path().join("data");
        config.settings.output.log_directory = dir.path().join("logs");
        Arc::new(config)
    }

    fn tracker(dir: &TempDir, fetcher: &StubFetcher, notifiers: Vec<Box<dyn Notifier>>) -> PriceTracker {
        PriceTracker::new(
            config(dir),
            Box::new(fetcher.clone()),
            SqliteStorage::in_memory().unwrap(),
            notifiers,
        )
    }

    #[tokio::test]
    async fn failing_site_does_not_block_the_others() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("486,00&nbsp;€"));

        let mut tracker = tracker(&dir, &fetcher, vec![]);
        let report = tracker.run_cycle().await;

        assert!(report.is_success());
        assert_eq!(report.success_rate(), "1/2");
        assert_eq!(report.readings[0].site, "Amazon.it");
        assert_eq!(report.readings[0].price, Decimal::from(486));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].site, "Phoneclick.it");
        assert!(matches!(
            report.failures[0].error,
            SiteError::Fetch(FetchError::Status(404))
        ));

        let metrics = tracker.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_scrapes, 1);
        assert_eq!(metrics.failed_scrapes, 1);

        let book = LatestPricesFile::new(dir.path().join("data").join("latest_prices.json")).load();
        assert_eq!(book.baseline("Amazon.it").unwrap().price, "€486,00");
        assert!(book.baseline("Phoneclick.it").is_none());
    }

    #[tokio::test]
    async fn implausible_price_is_kept() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("€50,00"));

        let mut tracker = tracker(&dir, &fetcher, vec![]);
        let report = tracker.run_cycle().await;

        assert!(report.is_success());
        assert_eq!(report.readings.len(), 1);
        assert_eq!(report.readings[0].price, Decimal::from(50));
        assert_eq!(tracker.metrics().successful_scrapes, 1);

        let history = tracker.storage.history_for_site("Amazon.it").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, "€50,00");

        let book = LatestPricesFile::new(dir.path().join("data").join("latest_prices.json")).load();
        assert_eq!(book.baseline("Amazon.it").unwrap().price, "€50,00");
    }

    #[tokio::test]
    async fn drop_on_second_cycle_raises_one_alert() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("486,00 €"));
        fetcher.set(PHONECLICK_URL, phoneclick_page("€480,00"));

        let notifier = RecordingNotifier::default();
        let mut tracker = tracker(&dir, &fetcher, vec![Box::new(notifier.clone())]);

        let first = tracker.run_cycle().await;
        assert_eq!(first.success_rate(), "2/2");
        assert!(first.alerts.is_empty());
        assert!(notifier.subjects.lock().unwrap().is_empty());

        fetcher.set(AMAZON_URL, amazon_page("440,00 €"));
        let second = tracker.run_cycle().await;

        assert_eq!(second.alerts.len(), 1);
        let alert = &second.alerts[0];
        assert_eq!(alert.site, "Amazon.it");
        assert_eq!(alert.previous_price, Decimal::from(486));
        assert_eq!(
            alert.reasons,
            vec![
                AlertReason::PercentageDrop { percent: Decimal::new(95, 1) },
                AlertReason::AbsoluteDrop { amount: Decimal::from(46) },
                AlertReason::TargetReached { target: Decimal::from(450) },
            ]
        );

        assert_eq!(
            notifier.subjects.lock().unwrap().as_slice(),
            ["🚨 Price Alert - Samsung Galaxy S23 256GB (1 alert)"]
        );
        assert_eq!(tracker.storage.count_alerts().unwrap(), 1);
        assert_eq!(tracker.storage.history_for_site("Amazon.it").unwrap().len(), 2);
        assert_eq!(tracker.storage.history_for_site("Phoneclick.it").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn baseline_survives_a_failed_read() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("486,00 €"));
        fetcher.set(PHONECLICK_URL, phoneclick_page("€480,00"));
        let mut tracker = tracker(&dir, &fetcher, vec![]);
        tracker.run_cycle().await;

        fetcher.remove(PHONECLICK_URL);
        tracker.run_cycle().await;

        fetcher.set(PHONECLICK_URL, phoneclick_page("€450,00"));
        let report = tracker.run_cycle().await;
        let alert = report.alerts.iter().find(|a| a.site == "Phoneclick.it").unwrap();
        assert_eq!(alert.previous_price, Decimal::from(480));
    }

    #[tokio::test]
    async fn notifier_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("486,00 €"));
        fetcher.set(PHONECLICK_URL, phoneclick_page("€480,00"));
        let mut tracker = tracker(&dir, &fetcher, vec![Box::new(FailingNotifier)]);
        tracker.run_cycle().await;

        fetcher.set(AMAZON_URL, amazon_page("400,00 €"));
        let report = tracker.run_cycle().await;
        assert!(report.is_success());
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(tracker.storage.count_alerts().unwrap(), 1);
    }

    #[tokio::test]
    async fn extraction_failure_saves_debug_html() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, r#"<span id="productTitle">Galaxy S23</span>"#.to_string());

        let mut tracker = tracker(&dir, &fetcher, vec![]);
        let report = tracker.run_cycle().await;

        assert!(!report.is_success());
        assert_eq!(report.success_rate(), "0/2");
        let amazon = report.failures.iter().find(|f| f.site == "Amazon.it").unwrap();
        assert!(matches!(
            amazon.error,
            SiteError::Extract(ExtractError::PriceNotFound { .. })
        ));
        assert!(dir.path().join("logs").join("html").join("debug-amazon_it.html").exists());
        assert!(!dir.path().join("data").join("latest_prices.json").exists());
    }

    #[tokio::test]
    async fn selector_check_reports_matches() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        fetcher.set(AMAZON_URL, amazon_page("486,00 €"));

        let tracker = tracker(&dir, &fetcher, vec![]);
        let checks = tracker.check_selectors().await;

        assert_eq!(checks.len(), 2);
        let amazon = checks[0].outcome.as_ref().unwrap();
        assert!(amazon.title.found);
        assert_eq!(amazon.title.text, "Samsung Galaxy S23 256GB");
        assert_eq!(amazon.price.text, "486,00 €");
        assert!(checks[1].outcome.is_err());
    }

    #[test]
    fn delay_stays_within_bounds() {
        assert_eq!(random_delay(&DelayConfig { min: 0.0, max: 0.0 }), Duration::ZERO);
        assert_eq!(random_delay(&DelayConfig { min: 2.0, max: 2.0 }), Duration::from_secs(2));
        for _ in 0..50 {
            let d = random_delay(&DelayConfig { min: 0.5, max: 1.5 });
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
    }
}
