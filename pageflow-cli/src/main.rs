//! Runs a scrape profile from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pageflow::analysis::{histogram, max_by_field, min_by_field, summarize};
use pageflow::cancellation::CancellationToken;
use pageflow::events::LoggingEventSink;
use pageflow::export::{export_csv_file, export_json_file};
use pageflow::observability::{init_tracing, LogFormat};
use pageflow::extract::ExtractionResult;
use pageflow::web::{download_assets, HttpFetcher, ScrapeProfile};

#[derive(Parser, Debug)]
#[command(name = "pageflow")]
#[command(about = "Crawl a paginated listing and extract one record per item", long_about = None)]
struct Args {
    /// Scrape profile (JSON)
    profile: PathBuf,

    /// Override the profile's start URL
    #[arg(short, long)]
    url: Option<String>,

    /// Stop after this many pages (0 = no limit)
    #[arg(short = 'p', long)]
    max_pages: Option<usize>,

    /// Navigation attempts per page transition
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Backoff unit in milliseconds
    #[arg(long)]
    backoff_ms: Option<u64>,

    /// Write results as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write results as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print statistics for a numeric field (repeatable)
    #[arg(long = "describe", value_name = "FIELD")]
    describe: Vec<String>,

    /// Histogram buckets for --describe
    #[arg(long, default_value_t = 5)]
    bins: usize,

    /// Download the asset named by --image-field for every record into this directory
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// Field holding the asset URL
    #[arg(long, default_value = "image_url")]
    image_field: String,

    /// Field used to name downloaded files
    #[arg(long, default_value = "title")]
    name_field: String,

    /// Log output format (text or json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Log every crawl event, not just degraded ones
    #[arg(short, long)]
    verbose: bool,
}

fn load_profile(args: &Args) -> Result<ScrapeProfile> {
    let mut profile = ScrapeProfile::from_file(&args.profile)
        .with_context(|| format!("loading profile {}", args.profile.display()))?;
    if let Some(url) = &args.url {
        profile.start_url.clone_from(url);
    }
    if let Some(pages) = args.max_pages {
        profile.crawl.max_pages = pages;
    }
    if let Some(retries) = args.max_retries {
        profile.crawl.max_nav_retries = retries;
    }
    if let Some(ms) = args.backoff_ms {
        profile.crawl = profile.crawl.with_backoff_unit(Duration::from_millis(ms));
    }
    profile.validate().context("invalid profile after overrides")?;
    Ok(profile)
}

fn describe(results: &[ExtractionResult], field: &str, bins: usize, label: &str) {
    let Some(summary) = summarize(results, field) else {
        println!("{field}: no numeric values");
        return;
    };
    println!("{summary}");
    let name = |r: &ExtractionResult| r.get(label).unwrap_or("?").to_string();
    if let Some(top) = max_by_field(results, field) {
        println!("  highest: {} ({})", name(top), top.get(field).unwrap_or_default());
    }
    if let Some(bottom) = min_by_field(results, field) {
        println!("  lowest:  {} ({})", name(bottom), bottom.get(field).unwrap_or_default());
    }
    for bucket in histogram(results, field, bins) {
        println!("  {bucket}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "pageflow=debug,info" } else { "info" };
    init_tracing(args.log_format, default_filter)?;

    let profile = load_profile(&args)?;
    let fetcher = Arc::new(HttpFetcher::new(profile.fetch.clone())?);

    let token = Arc::new(CancellationToken::new());
    let signal_token = Arc::clone(&token);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            signal_token.cancel("interrupted");
        }
    });

    let sink = if args.verbose {
        LoggingEventSink::info()
    } else {
        LoggingEventSink::debug()
    };
    info!(start_url = %profile.start_url, "Starting crawl");
    let report = profile
        .run_with(fetcher.clone(), |engine| {
            engine
                .with_event_sink(Arc::new(sink))
                .with_cancellation(Arc::clone(&token))
        })
        .await
        .context("crawl could not start")?;

    if let Some(path) = &args.csv {
        export_csv_file(path, &profile.extractor.field_names(), &report.results)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        export_json_file(path, &report.results).with_context(|| format!("writing {}", path.display()))?;
    }

    if let Some(dir) = &args.images {
        let assets = download_assets(fetcher.as_ref(), &report.results, &args.name_field, &args.image_field, dir).await;
        info!(
            saved = assets.saved.len(),
            failed = assets.failed.len(),
            skipped = assets.skipped,
            "Asset download finished"
        );
    }

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    for field in &args.describe {
        describe(&report.results, field, args.bins, &args.name_field);
    }
    Ok(())
}
