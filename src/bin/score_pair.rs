//! Score a single pair of records, for threshold tuning.
//!
//! Usage:
//!   score-pair --title-a "Song Title" --artist-a "Artist" \
//!              --title-b "Artist - Song Title (Official Video)" --channel-b "ArtistVEVO"
//!
//! A `--channel-*` makes that side a video: the title is parsed into
//! (artist, track) with the channel as fallback artist. A side that ends up
//! without a track or artist is rejected exactly as the pipeline would.

use anyhow::{bail, Result};
use clap::Parser;
use env_logger::Env;

use track_unify::config::UnifyConfig;
use track_unify::models::{ChartRecord, NormalizedRecord, VideoRecord};
use track_unify::scoring::score_pair;
use track_unify::unify::{normalize_chart, normalize_video};

#[derive(Parser)]
#[command(name = "score-pair")]
#[command(about = "Show normalized forms and similarity scores for two records")]
struct Args {
    #[arg(long)]
    title_a: String,
    #[arg(long)]
    artist_a: Option<String>,
    #[arg(long)]
    channel_a: Option<String>,

    #[arg(long)]
    title_b: String,
    #[arg(long)]
    artist_b: Option<String>,
    #[arg(long)]
    channel_b: Option<String>,

    #[arg(long)]
    threshold: Option<f64>,

    /// JSON config file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// Run one side through the same normalizer the pipeline uses.
fn build_side(
    label: &str,
    title: &str,
    artist: Option<&str>,
    channel: Option<&str>,
) -> Result<NormalizedRecord> {
    let record = match (artist, channel) {
        (Some(_), Some(_)) => bail!("Give either an artist or a channel per side, not both"),
        (Some(artist), None) => normalize_chart(
            &ChartRecord {
                track_name: Some(title.to_string()),
                artist_name: Some(artist.to_string()),
                ..Default::default()
            },
            0,
        )?,
        (None, channel) => normalize_video(&VideoRecord {
            video_id: label.to_string(),
            title: Some(title.to_string()),
            channel_title: channel.map(str::to_string),
            ..Default::default()
        })?,
    };
    Ok(record)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => UnifyConfig::from_file(path)?,
        None => UnifyConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.similarity_threshold = threshold;
    }
    config.validate()?;

    let a = build_side("a", &args.title_a, args.artist_a.as_deref(), args.channel_a.as_deref())?;
    let b = build_side("b", &args.title_b, args.artist_b.as_deref(), args.channel_b.as_deref())?;

    println!("A: {:?} by {:?}", a.track_name, a.artist_name);
    println!("B: {:?} by {:?}", b.track_name, b.artist_name);

    let score = score_pair(&a, &b, &config);
    println!("  title:    {:.4}", score.title);
    match score.artist {
        Some(artist) => println!("  artist:   {:.4}", artist),
        None => println!("  artist:   (not compared)"),
    }
    println!("  combined: {:.4} ({:?})", score.combined, score.strategy);

    let verdict = if score.combined >= config.similarity_threshold {
        "DUPLICATE"
    } else {
        "distinct"
    };
    println!("  {} at threshold {:.2}", verdict, config.similarity_threshold);

    Ok(())
}
