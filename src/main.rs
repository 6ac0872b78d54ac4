use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

use track_unify::config::UnifyConfig;
use track_unify::progress::{create_spinner, format_duration, set_log_only};
use track_unify::safety::validate_output_path;
use track_unify::store::{RecordStore, DEFAULT_OUTPUT_TABLE};
use track_unify::unify::Unifier;

#[derive(Parser)]
#[command(name = "track-unify")]
#[command(about = "Normalize, deduplicate and merge chart and video music records")]
struct Args {
    /// Collection database with chart_data and youtube_videos tables
    db: PathBuf,

    /// Write unified records as JSON (file name must contain "unified")
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    threshold: Option<f64>,

    /// Score every pair instead of only pairs sharing a title token
    #[arg(long)]
    no_blocking: bool,

    /// Store unified records back into the database
    #[arg(long)]
    write_table: bool,

    #[arg(long, default_value = DEFAULT_OUTPUT_TABLE)]
    table: String,

    /// Threads for pair scoring (0 = all cores)
    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn load_config(args: &Args) -> Result<UnifyConfig> {
    let mut config = match &args.config {
        Some(path) => UnifyConfig::from_file(path)?,
        None => UnifyConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.similarity_threshold = threshold;
    }
    if args.no_blocking {
        config.blocking = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn write_json(path: &Path, records: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    if let Some(output) = &args.output {
        validate_output_path(output, "unified", &[args.db.as_path()])?;
    }

    let config = load_config(&args)?;
    info!(
        "Threshold {:.2}, weights {:.2}/{:.2}, blocking {}, preferred source {}",
        config.similarity_threshold,
        config.title_weight,
        config.artist_weight,
        config.blocking,
        config.preferred_source
    );

    let start = Instant::now();

    info!("Opening database: {:?}", args.db);
    let mut store = RecordStore::open(&args.db)?;
    let charts = store.load_chart_records()?;
    let videos = store.load_video_records()?;

    let spinner = create_spinner("Unifying records");
    let output = Unifier::new(config).run(&charts, &videos)?;
    spinner.finish_with_message(format!("Unified into {} records", output.records.len()));

    if let Some(path) = &args.output {
        write_json(path, &output.records)?;
        info!("Wrote {} records to {:?}", output.records.len(), path);
    }
    if let Some(path) = &args.stats {
        output.stats.write_to_file(path)?;
        info!("Wrote stats to {:?}", path);
    }
    if args.write_table {
        store.save_unified(&output.records, &args.table)?;
    }

    let stats = &output.stats;
    println!("\n{:=<60}", "");
    println!("Unification complete!");
    println!(
        "  Input:      {} chart ({} malformed), {} video ({} malformed)",
        stats.chart_received, stats.chart_malformed, stats.video_received, stats.video_malformed
    );
    println!(
        "  Duplicates: {} chart, {} video, {} cross-source",
        stats.chart_duplicates_removed,
        stats.video_duplicates_removed,
        stats.cross_source_duplicates_removed
    );
    println!("  Unparseable durations: {}", stats.unparseable_durations);
    println!(
        "  Output:     {} records ({:.1}% of valid input)",
        stats.final_count,
        stats.retained_pct()
    );
    println!("  Elapsed:    {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
