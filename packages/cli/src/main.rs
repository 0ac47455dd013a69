#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scrapes the weekly MICM fuel-price bulletin.
//!
//! ```text
//! fuel_watch scrape [--kind auto|html_table|text_pdf|scanned_pdf] [--url URL]
//! fuel_watch trend
//! fuel_watch [--data-dir PATH] [--config PATH]
//! ```
//!
//! Running without a subcommand scrapes and then rebuilds the trend.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fuel_watch_cli_utils::{IndicatifProgress, MultiProgress};
use fuel_watch_models::SourceKind;
use fuel_watch_pipeline::config::PipelineConfig;
use fuel_watch_store::DataDir;

#[derive(Parser)]
#[command(
    name = "fuel_watch",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Scrape the weekly MICM fuel-price bulletin"
)]
struct Cli {
    /// Directory holding latest.json, history/ and the trend files
    #[arg(long, global = true, env = "FUEL_WATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML file with [source] and/or [extract] tables
    #[arg(long, global = true, env = "FUEL_WATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch this week's bulletin and write latest.json and history
    Scrape {
        /// How to read the document (defaults to the configured kind)
        #[arg(long)]
        kind: Option<SourceKind>,
        /// Listing page, or the bulletin itself when it ends in .pdf
        #[arg(long)]
        url: Option<String>,
    },
    /// Rebuild trend.json and trend_min.json from history
    Trend,
}

async fn scrape(
    multi: &MultiProgress,
    config: &PipelineConfig,
    kind: Option<SourceKind>,
    dir: &DataDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::stages_bar(multi, "Scraping");
    let report = fuel_watch_pipeline::run_scrape(config, kind, dir, progress.as_ref()).await?;

    let bulletin = &report.assembled.bulletin;
    println!(
        "{} prices from {} ({})",
        bulletin.items.len(),
        bulletin.source,
        report.kind
    );
    for item in &bulletin.items {
        println!("  {:<28} {:>9.2} DOP/{}", item.label, item.price_dop, item.unit);
    }
    println!("Saved {}", report.written.latest.display());
    Ok(())
}

fn trend(multi: &MultiProgress, dir: &DataDir) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::stages_bar(multi, "Trend");
    let summary = fuel_watch_pipeline::run_trend(dir, progress.as_ref())?;
    println!(
        "{} series, {} points from {} history files",
        summary.series, summary.points, summary.files
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = fuel_watch_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    let dir = cli.data_dir.map_or_else(DataDir::default, DataDir::new);
    log::debug!("Data directory: {}", dir.root().display());

    match cli.command {
        Some(Commands::Scrape { kind, url }) => {
            if url.is_some() {
                config.source_url = url;
            }
            scrape(&multi, &config, kind, &dir).await?;
        }
        Some(Commands::Trend) => trend(&multi, &dir)?,
        None => {
            scrape(&multi, &config, None, &dir).await?;
            trend(&multi, &dir)?;
        }
    }

    Ok(())
}
