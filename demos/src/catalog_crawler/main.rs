use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use catalog_crawler::{
    config,
    crawler::{CategorySelection, DedupPolicy},
    engine::{ExtractionConfig, HttpEngine, HttpEngineOptions},
    fetcher::EngineFetcher,
    sink::{CsvSink, FlushPolicy},
    Crawler,
};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "catalog-crawler",
    about = "Crawl paginated product catalogs into CSV files"
)]
struct Cli {
    /// Site profile (JSON)
    #[arg(short, long, value_name = "FILE")]
    profile: PathBuf,

    /// Crawl only this category (index into the profile's list)
    #[arg(short, long, conflicts_with = "all_categories")]
    category: Option<usize>,

    /// Crawl every category in turn
    #[arg(long)]
    all_categories: bool,

    #[arg(long, value_name = "N")]
    start_page: Option<usize>,

    /// Pause between pages
    #[arg(long, value_name = "SECS")]
    delay_secs: Option<f64>,

    /// Write to the test destination and stop after one page
    #[arg(long)]
    test_mode: bool,

    /// Override the destination of the selected mode
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write everything once at the end instead of after every page
    #[arg(long)]
    buffered: bool,

    /// Drop products whose URL was already written in this run
    #[arg(long)]
    dedup_urls: bool,

    /// Print the profile's categories and exit
    #[arg(long)]
    list_categories: bool,

    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .context("telemetry: Creating EnvFilter")?,
        )
        .init();

    let cli = Cli::parse();
    let (profile, mut run) = config::load_profile(&cli.profile)
        .with_context(|| format!("loading profile '{}'", cli.profile.display()))?;

    if cli.list_categories {
        for (index, category) in profile.categories.iter().enumerate() {
            println!("{index:>3}  {:<24} {}", category.name, category.base_url);
        }
        return Ok(());
    }

    if let Some(index) = cli.category {
        profile.category(index)?;
        run.categories = CategorySelection::Single(index);
    }
    if cli.all_categories {
        run.categories = CategorySelection::All;
    }
    if let Some(start_page) = cli.start_page {
        run.start_page = start_page;
    }
    if let Some(delay_secs) = cli.delay_secs {
        run.delay_secs = delay_secs;
    }
    run.test_mode |= cli.test_mode;
    if let Some(output) = cli.output {
        if run.test_mode {
            run.test_file = output;
        } else {
            run.main_file = output;
        }
    }
    if cli.buffered {
        run.flush = FlushPolicy::Buffered;
    }
    if cli.dedup_urls {
        run.dedup = DedupPolicy::ByUrl;
    }

    let options = run.crawler_options()?;
    tracing::info!(destination = %run.destination().display(), test_mode = run.test_mode, "starting crawl");
    let mut sink = CsvSink::new(run.destination(), profile.columns())
        .with_list_separator(&run.list_separator);
    let engine = HttpEngine::new(HttpEngineOptions {
        timeout: Duration::from_secs(cli.timeout_secs),
        ..HttpEngineOptions::default()
    });
    let fetcher = EngineFetcher::new(engine, ExtractionConfig::from(&profile));

    let summary = Crawler::new(options)
        .run(&profile, &fetcher, &mut sink, signal::ctrl_c())
        .await;

    println!(
        "{}: {} pages crawled, {} skipped, {} records written to '{}' (estimated at least {} listed)",
        summary.stop_reason,
        summary.pages_crawled,
        summary.pages_skipped,
        summary.records_written,
        sink.path().display(),
        summary.estimated_total
    );
    Ok(())
}
