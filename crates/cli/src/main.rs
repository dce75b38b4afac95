use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use statsaver_tracker::{AggregateStats, LocalFs, ViewedEntry, ViewedStatusTracker};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "statsaver")]
#[command(about = "Track viewed status images and their storage usage", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the status source directory
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Keep rescanning every refresh_interval_secs until interrupted
    #[arg(long)]
    watch: bool,

    /// Print the registry and stats as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    entries: &'a [ViewedEntry],
    stats: &'a AggregateStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with levels, RUST_LOG overrides the default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Status Saver v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    info!("Loading configuration...");
    let mut config = match statsaver_tracker::config::load_config(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if let Some(source) = args.source {
        config.source_dir = source;
    }

    info!("Source directory: {:?}", config.source_dir);
    info!("Working directory: {:?}", config.work_dir);
    info!("Image extensions: {:?}", config.image_extensions);
    info!("Persist registry: {}", config.persist_registry);

    let refresh_interval = Duration::from_secs(config.refresh_interval_secs);
    let persist = config.persist_registry;
    let tracker = ViewedStatusTracker::new(LocalFs::new(), config);

    if persist {
        if let Err(e) = tracker.restore_snapshot().await {
            warn!("Ignoring unreadable snapshot: {:#}", e);
        }
    }

    if !args.watch {
        if let Err(e) = tracker.scan().await {
            error!("Scan failed: {}", e);
            return Err(e.into());
        }
        return print_registry(&tracker, args.json).await;
    }

    info!("Watching, refresh every {} seconds", refresh_interval.as_secs());
    loop {
        match tracker.try_scan().await {
            Ok(Some(_)) => print_registry(&tracker, args.json).await?,
            Ok(None) => {}
            // Keep the last good registry and try again next cycle
            Err(e) => error!("Scan failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(refresh_interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, exiting");
                return Ok(());
            }
        }
    }
}

async fn print_registry(tracker: &ViewedStatusTracker<LocalFs>, json: bool) -> Result<()> {
    let (entries, stats) = tracker.view().await;

    if json {
        let output = Output {
            entries: &entries,
            stats: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {:>10}  {}",
            entry.modified_at.format("%Y-%m-%d %H:%M:%S"),
            entry.size_bytes,
            entry.source_path.display()
        );
    }
    println!("{} viewed, {}", stats.total_count, stats.formatted_size);
    Ok(())
}
