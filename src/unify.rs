//! Pipeline orchestration: raw records in, unified records and stats out.
//!
//! Phases:
//! 1. Normalize each source into the common schema (malformed rows skipped)
//! 2. Within-source dedupe: charts, then videos
//! 3. Cross-source dedupe over charts followed by videos
//!
//! Every pass works on `UnifiedRecord`s, so provenance from an earlier pass
//! carries into the next one.

use log::{debug, info, warn};

use crate::config::UnifyConfig;
use crate::dedupe::find_duplicates;
use crate::duration::parse_iso_duration;
use crate::error::{Result, UnifyError};
use crate::merge::resolve;
use crate::models::{
    ChartRecord, EngagementMetrics, NormalizedRecord, Source, UnifiedRecord, UnifyStats,
    VideoRecord,
};
use crate::normalize::{normalize_artist, normalize_title};
use crate::title_parser::extract_artist_track;

// ============================================================================
// Per-Record Normalization
// ============================================================================

fn malformed(origin: Source, record: String, reason: &'static str) -> UnifyError {
    UnifyError::MalformedRecord {
        origin,
        record,
        reason,
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Provenance id of a chart row. The batch index keeps ids unique when a
/// chart is collected twice for the same date or lacks name and date.
fn chart_id(raw: &ChartRecord, idx: usize) -> String {
    let name = raw.chart_name.as_deref().unwrap_or("unknown");
    let date = raw.chart_date.as_deref().unwrap_or("");
    match raw.position {
        Some(pos) => format!("chart:{}:{}#{}@{}", name, date, pos, idx),
        None => format!("chart:{}:{}@{}", name, date, idx),
    }
}

/// Normalize one chart row. `idx` is its position in the input batch.
pub fn normalize_chart(raw: &ChartRecord, idx: usize) -> Result<NormalizedRecord> {
    let id = chart_id(raw, idx);

    let original_title = raw
        .track_name
        .clone()
        .ok_or_else(|| malformed(Source::Chart, id.clone(), "missing track_name"))?;
    let original_artist = raw
        .artist_name
        .clone()
        .ok_or_else(|| malformed(Source::Chart, id.clone(), "missing artist_name"))?;

    let track_name = normalize_title(&original_title);
    if track_name.is_empty() {
        return Err(malformed(Source::Chart, id, "empty track name after normalization"));
    }
    let artist_name = normalize_artist(&original_artist);
    if artist_name.is_empty() {
        return Err(malformed(Source::Chart, id, "empty artist name after normalization"));
    }

    Ok(NormalizedRecord {
        id,
        track_name,
        artist_name,
        source: Source::Chart,
        chart_name: non_blank(raw.chart_name.as_ref()),
        chart_position: raw.position,
        chart_date: non_blank(raw.chart_date.as_ref()),
        engagement_metrics: None,
        chart_details: raw.additional_data.clone(),
        original_title,
        original_artist,
    })
}

/// Seconds of a video's ISO-8601 duration; unparseable values become `None`.
fn video_duration(raw: &VideoRecord) -> Option<u64> {
    let duration = raw.duration.as_deref()?;
    match parse_iso_duration(duration) {
        Ok(secs) => Some(secs),
        Err(e) => {
            warn!("video:{}: {}, treating duration as unknown", raw.video_id, e);
            None
        }
    }
}

/// Normalize one video.
///
/// The title is cleaned first so promotional suffixes never end up in the
/// parsed track; the channel name is the artist when the title carries none.
pub fn normalize_video(raw: &VideoRecord) -> Result<NormalizedRecord> {
    let id = format!("video:{}", raw.video_id);

    let original_title = raw
        .title
        .clone()
        .ok_or_else(|| malformed(Source::Video, id.clone(), "missing title"))?;
    let original_artist = raw.channel_title.clone().unwrap_or_default();

    let cleaned = normalize_title(&original_title);
    let channel = normalize_artist(&original_artist);
    let (artist, track) = extract_artist_track(&cleaned, &channel);

    let track_name = normalize_title(&track);
    if track_name.is_empty() {
        return Err(malformed(Source::Video, id, "empty track name after normalization"));
    }
    let artist_name = normalize_artist(&artist);
    if artist_name.is_empty() {
        return Err(malformed(Source::Video, id, "empty artist name after normalization"));
    }

    let metrics = EngagementMetrics {
        views: raw.view_count,
        likes: raw.like_count,
        comments: raw.comment_count,
        duration_seconds: video_duration(raw),
    };

    Ok(NormalizedRecord {
        id,
        track_name,
        artist_name,
        source: Source::Video,
        chart_name: None,
        chart_position: None,
        chart_date: None,
        engagement_metrics: (metrics.populated() > 0).then_some(metrics),
        chart_details: None,
        original_title,
        original_artist,
    })
}

// ============================================================================
// Unifier
// ============================================================================

/// Result of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifyOutput {
    pub records: Vec<UnifiedRecord>,
    pub stats: UnifyStats,
}

/// Runs the whole pipeline with an explicit configuration.
#[derive(Debug, Clone, Default)]
pub struct Unifier {
    config: UnifyConfig,
}

impl Unifier {
    pub fn new(config: UnifyConfig) -> Self {
        Self { config }
    }

    /// Detect and merge duplicates in `records`. Returns the merged
    /// collection (ordered by each cluster's first member) and the number
    /// of records folded away.
    fn dedupe_pass(
        &self,
        records: Vec<UnifiedRecord>,
        phase: &str,
    ) -> Result<(Vec<UnifiedRecord>, usize)> {
        let clusters = find_duplicates(&records, &self.config);
        let merged = clusters
            .iter()
            .map(|cluster| resolve(cluster, &records, self.config.preferred_source))
            .collect::<Result<Vec<_>>>()?;

        let removed = records.len() - merged.len();
        info!(
            "[{}] {} records -> {} ({} duplicates removed)",
            phase,
            records.len(),
            merged.len(),
            removed
        );
        Ok((merged, removed))
    }

    /// Normalize, dedupe within each source, then dedupe across sources.
    ///
    /// Malformed rows and unparseable durations are counted and logged; the
    /// only errors returned are an invalid config or a broken invariant.
    pub fn run(&self, charts: &[ChartRecord], videos: &[VideoRecord]) -> Result<UnifyOutput> {
        self.config.validate()?;

        let mut stats = UnifyStats {
            chart_received: charts.len(),
            video_received: videos.len(),
            ..Default::default()
        };

        let mut chart_records = Vec::with_capacity(charts.len());
        for (idx, raw) in charts.iter().enumerate() {
            match normalize_chart(raw, idx) {
                Ok(record) => chart_records.push(UnifiedRecord::from(record)),
                Err(e) => {
                    warn!("Skipping {}", e);
                    stats.chart_malformed += 1;
                }
            }
        }

        let mut video_records = Vec::with_capacity(videos.len());
        for raw in videos {
            match normalize_video(raw) {
                Ok(record) => {
                    let has_duration = record
                        .engagement_metrics
                        .as_ref()
                        .is_some_and(|m| m.duration_seconds.is_some());
                    if raw.duration.is_some() && !has_duration {
                        stats.unparseable_durations += 1;
                    }
                    video_records.push(UnifiedRecord::from(record));
                }
                Err(e) => {
                    warn!("Skipping {}", e);
                    stats.video_malformed += 1;
                }
            }
        }
        debug!(
            "Normalized {} chart and {} video records",
            chart_records.len(),
            video_records.len()
        );

        let (chart_records, removed) = self.dedupe_pass(chart_records, "chart")?;
        stats.chart_duplicates_removed = removed;
        let (video_records, removed) = self.dedupe_pass(video_records, "video")?;
        stats.video_duplicates_removed = removed;

        let mut combined = chart_records;
        combined.extend(video_records);
        let (records, removed) = self.dedupe_pass(combined, "cross-source")?;
        stats.cross_source_duplicates_removed = removed;

        stats.final_count = records.len();
        stats.log_phase("UNIFY");

        Ok(UnifyOutput { records, stats })
    }
}
