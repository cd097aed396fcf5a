use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use pricewatch::config::{AppConfig, LoggingConfig};
use pricewatch::plugins::ExtractorRegistry;
use pricewatch::runner::{BatchRunner, build_fetcher};
use pricewatch::scheduler::BatchScheduler;
use pricewatch::watchlist::load_watchlist;

#[derive(Debug, Parser)]
#[command(name = "pricewatch", version, about = "Checks product prices and texts you when they drop")]
struct Cli {
    /// Extra configuration file, layered over config/*.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check every entry in the watch list once
    Run {
        #[arg(short, long)]
        input: PathBuf,
        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Write the run summary and every result as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Re-run the watch list on a cron schedule until interrupted
    Schedule {
        #[arg(short, long)]
        input: PathBuf,
        /// Six-field cron expression (with seconds)
        #[arg(long)]
        cron: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch one page and show the price that would be read from it
    Check { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()
            .context("Failed to start metrics exporter")?;
        info!("Metrics available on port {}", config.metrics.port);
    }

    match cli.command {
        Command::Run { input, dry_run, report } => run_once(&config, &input, dry_run, report.as_deref()).await,
        Command::Schedule { input, cron, dry_run } => run_scheduled(&config, input, cron, dry_run).await,
        Command::Check { url } => check_url(&config, &url).await,
    }
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pricewatch=info"));

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
            let appender = tracing_appender::rolling::daily(directory, "pricewatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run_once(config: &AppConfig, input: &Path, dry_run: bool, report_path: Option<&Path>) -> Result<()> {
    let watchlist = load_watchlist(input)?;
    let runner = BatchRunner::from_config(config, dry_run).await?;

    let report = runner.run_batch(&watchlist.entries).await;

    for result in &report.results {
        println!("{:<20} {}", result.outcome.label(), result.reading.entry.product_url);
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

async fn run_scheduled(config: &AppConfig, input: PathBuf, cron: Option<String>, dry_run: bool) -> Result<()> {
    let cron = cron.unwrap_or_else(|| config.scheduler.default_interval.clone());
    if !config.is_valid_cron(&cron) {
        bail!("Invalid cron expression '{}': expected 6 or 7 fields", cron);
    }

    // Fail fast on a bad path; later ticks only log read errors.
    load_watchlist(&input)?;

    let runner = Arc::new(BatchRunner::from_config(config, dry_run).await?);
    let mut scheduler = BatchScheduler::new(runner, input, &config.scheduler).await?;
    scheduler.start(&cron).await?;

    info!("Scheduler running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    scheduler.shutdown().await?;
    let job = scheduler.job_info().await;
    info!(
        "Completed {} scheduled run(s): {} succeeded, {} failed, {} skipped",
        job.run_count, job.success_count, job.error_count, job.skipped_count
    );

    Ok(())
}

async fn check_url(config: &AppConfig, url: &str) -> Result<()> {
    let fetcher = build_fetcher(&config.scraper)?;
    let extractors = ExtractorRegistry::from_config(&config.sites)?;

    let page = fetcher.fetch(url).await.with_context(|| format!("Failed to fetch {}", url))?;
    info!("Fetched {} ({} ms)", page.final_url, page.response_time_ms);

    match extractors.extract(url, &page.body) {
        Some(found) => println!(
            "{} ({} via {:?}: {})",
            found.price,
            extractors.for_url(url).name(),
            found.strategy,
            found.rule
        ),
        None => println!("No price found on {}", url),
    }

    Ok(())
}
