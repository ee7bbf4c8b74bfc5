use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{info, warn};

use killtony_worker::config::Config;
use killtony_worker::pipeline::{PipelineRunner, RunMode};
use killtony_worker::store::JsonCatalogStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "killtony_worker=info,warn".into()),
        )
        .init();

    let matches = Command::new("Kill Tony Catalog Worker")
        .version("0.1.0")
        .about("Extracts episodes and contestant performances from the show's YouTube catalog")
        .arg(
            Arg::new("mode")
                .help("Run mode: recent (default), full, or dry-run")
                .default_value("recent"),
        )
        .arg(
            Arg::new("max-videos")
                .short('n')
                .long("max-videos")
                .value_name("NUM")
                .help("Maximum number of videos to fetch"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Concurrent caption fetches per batch"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML config file"),
        )
        .get_matches();

    let mode: RunMode = matches
        .get_one::<String>("mode")
        .map(|s| s.as_str())
        .unwrap_or("recent")
        .parse()?;
    let max_videos: Option<usize> = matches
        .get_one::<String>("max-videos")
        .map(|s| s.parse())
        .transpose()?;
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);

    // Load configuration
    let mut config = Config::load(config_path.as_ref()).unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        let mut config = Config::default();
        config.apply_env();
        config
    });

    if let Some(workers) = matches.get_one::<String>("workers") {
        config.pipeline.concurrency = workers.parse()?;
    }

    config.validate()?;

    info!("🚀 Kill Tony catalog worker starting...");

    let store = JsonCatalogStore::new(&config.store.catalog_dir);
    let catalog_dir = config.store.catalog_dir.clone();
    let runner = PipelineRunner::new(config)?;

    let summary = runner.run(mode, max_videos, &store).await?;

    info!("🎉 Run completed in {:.2}s", summary.elapsed.as_secs_f64());
    info!("🎬 Episodes: {}", summary.episodes);
    info!("🎤 Performances: {}", summary.performances);
    info!("🧑 Contestants: {}", summary.contestants);
    info!("🔇 Videos missing captions: {}", summary.videos_missing_captions);
    info!("⚠️ Videos with caption errors: {}", summary.videos_with_errors);
    if mode != RunMode::DryRun {
        info!("💾 Catalog store: {}", catalog_dir.display());
    }

    Ok(())
}
