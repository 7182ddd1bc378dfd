mod analyzer;
mod config;
mod model;
mod normalizer;
mod notifier;
mod parser;
mod scraper;
mod storage;
mod tracker;
mod utils;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use config::{load_config, AppConfig};
use notifier::build_notifiers;
use scraper::HttpFetcher;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use storage::SqliteStorage;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use tracker::{CycleReport, PriceTracker, SelectorCheck, TrackerMetrics};
use utils::truncate_title;

#[derive(Parser, Debug)]
#[command(name = "price-sniper", version)]
#[command(about = "Tracks one product's price across e-commerce sites and raises drop alerts")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single tracking cycle (default)
    Run,
    /// Run tracking cycles until Ctrl-C
    Daemon {
        /// Seconds between cycles, overrides settings.check_interval_seconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Fetch every enabled site and show how its selectors match
    CheckSelectors,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let loaded = load_config(&cli.config);
    let _guard = init_tracing(loaded.as_ref().ok());

    let config = match loaded {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command.unwrap_or(Command::Run), config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Console output plus a daily rolling file under the configured log directory.
fn init_tracing(config: Option<&AppConfig>) -> Option<WorkerGuard> {
    let level = config
        .map(|c| c.settings.logging.level.as_str())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},reqwest=warn,hyper=warn", level)));

    let (file_layer, guard) = match config {
        Some(c) => {
            let appender = tracing_appender::rolling::daily(&c.settings.output.log_directory, "tracker.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn run(command: Command, config: Arc<AppConfig>) -> Result<ExitCode> {
    let interval = config.settings.check_interval_seconds;
    let mut tracker = build_tracker(Arc::clone(&config))?;

    match command {
        Command::Run => {
            let report = tracker.run_cycle().await;
            println!("{}", format_summary(&config, &report, tracker.metrics()));
            Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Daemon { interval: custom } => {
            daemon(tracker, custom.unwrap_or(interval).max(1)).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckSelectors => {
            let checks = tracker.check_selectors().await;
            print_selector_checks(&checks);
            let all_found = checks.iter().all(|check| {
                check
                    .outcome
                    .as_ref()
                    .is_ok_and(|m| m.title.found && m.price.found)
            });
            Ok(if all_found { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

fn build_tracker(config: Arc<AppConfig>) -> Result<PriceTracker> {
    let data_dir = &config.settings.output.data_directory;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;

    let storage = SqliteStorage::new(config.database_path()).context("failed to initialize storage")?;
    let fetcher = HttpFetcher::new(config.settings.timeout).context("failed to build HTTP client")?;
    let notifiers = build_notifiers(&config.alerts);

    info!(
        "Tracking '{}' on {} site(s)",
        config.product.name,
        config.enabled_sites().len()
    );
    Ok(PriceTracker::new(config, Box::new(fetcher), storage, notifiers))
}

async fn daemon(mut tracker: PriceTracker, interval_secs: u64) {
    info!("🔁 Daemon mode: one cycle every {}s", interval_secs);
    loop {
        let report = tracker.run_cycle().await;
        if !report.is_success() {
            warn!("Cycle failed ({}), next attempt in {}s", report.success_rate(), interval_secs);
        }

        info!("Waiting for timer ({}s) or Ctrl-C...", interval_secs);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval_secs)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutting down...");
                break;
            }
        }
    }

    let metrics = tracker.metrics();
    info!(
        "Requests: {} | ok: {} | failed: {} | avg response: {:.0}ms",
        metrics.total_requests,
        metrics.successful_scrapes,
        metrics.failed_scrapes,
        metrics.avg_response_time_ms()
    );
}

fn format_summary(config: &AppConfig, report: &CycleReport, metrics: &TrackerMetrics) -> String {
    let rule = "-".repeat(60);
    let mut lines = Vec::new();
    if !report.is_success() {
        lines.push(format!("❌ Tracking failed ({} prices)", report.success_rate()));
        for failure in &report.failures {
            lines.push(format!("   {}: {}", failure.site, failure.error));
        }
        return lines.join("\n");
    }

    lines.push(format!("\n🚀 Price Sniper - {}", report.product));
    if !config.product.description.is_empty() {
        lines.push(format!("   {}", config.product.description));
    }
    lines.push(format!("   {}", report.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S")));
    lines.push(rule.clone());
    for reading in &report.readings {
        lines.push(format!("✅ {}: {} - {}", reading.site, truncate_title(&reading.title, 50), reading.display));
    }
    for failure in &report.failures {
        lines.push(format!("❌ {}: {}", failure.site, failure.error));
    }
    for alert in &report.alerts {
        lines.push(format!("🚨 {}: {} ({})", alert.site, alert.price_formatted, alert.reasons_text()));
    }
    lines.push(rule);
    lines.push(format!(
        "📊 Collected {} prices in {:.2}s (avg response {:.0}ms)",
        report.success_rate(),
        report.elapsed.as_secs_f64(),
        metrics.avg_response_time_ms()
    ));
    lines.join("\n")
}

fn print_selector_checks(checks: &[SelectorCheck]) {
    for check in checks {
        println!("\n🔎 {} ({})", check.site, check.url);
        match &check.outcome {
            Ok(found) => {
                println!("   page size: {} bytes", found.page_bytes);
                for (label, probe) in [("title", &found.title), ("price", &found.price)] {
                    let mark = if probe.found { "✅" } else { "❌" };
                    println!(
                        "   {} {} `{}`: {}",
                        mark,
                        label,
                        probe.selector,
                        truncate_title(&probe.text, 80)
                    );
                }
            }
            Err(e) => println!("   ❌ {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::config::tests::SAMPLE;
    use crate::model::PriceReading;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn report() -> CycleReport {
        let timestamp = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        CycleReport {
            timestamp,
            product: "Samsung Galaxy S23 256GB".into(),
            readings: vec![PriceReading {
                site: "Amazon.it".into(),
                title: "Samsung Galaxy S23 256GB".into(),
                price_text: "486,00 €".into(),
                price: Decimal::from(486),
                display: "€486,00".into(),
                url: "https://www.amazon.it/dp/B0C78GHQRJ".into(),
                fetched_at: timestamp,
                response_time_ms: 120,
            }],
            failures: vec![],
            total_sites: 2,
            alerts: vec![],
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn summary_shows_description_and_cycle_time() {
        let config = parse_config(SAMPLE).unwrap();
        let report = report();
        let summary = format_summary(&config, &report, &TrackerMetrics::default());

        assert!(summary.contains("🚀 Price Sniper - Samsung Galaxy S23 256GB"));
        assert!(summary.contains("   Black"));
        let local = report.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string();
        assert!(summary.contains(&local));
        assert!(summary.contains("✅ Amazon.it: Samsung Galaxy S23 256GB - €486,00"));
        assert!(summary.contains("📊 Collected 1/2 prices"));
    }

    #[test]
    fn failed_summary_lists_causes() {
        let config = parse_config(SAMPLE).unwrap();
        let mut report = report();
        report.readings.clear();
        let summary = format_summary(&config, &report, &TrackerMetrics::default());
        assert!(summary.starts_with("❌ Tracking failed (0/2 prices)"));
    }
}
