//! Core data models for chart/video unification.
//!
//! This module contains the raw collector records, the common normalized
//! schema, the detector's candidate/cluster types and the run statistics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Source
// ============================================================================

/// Which collector produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Chart,
    Video,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Chart => "chart",
            Source::Video => "video",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Raw Records
// ============================================================================

/// Chart entry as delivered by the chart collector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChartRecord {
    pub position: Option<i64>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub chart_name: Option<String>,
    pub chart_date: Option<String>,
    #[serde(default)]
    pub additional_data: Option<ChartDetails>,
}

/// Video as delivered by the video collector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: Option<String>,
    pub channel_title: Option<String>,
    pub published_at: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    /// ISO-8601 duration, e.g. "PT4M13S"
    pub duration: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category_id: Option<String>,
}

/// Provider-specific chart metadata.
///
/// Chart collectors attach a loose JSON object to each entry. Only the shapes
/// of the known providers are kept; anything else is dropped as `None` by
/// [`ChartDetails::from_json`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ChartDetails {
    Itunes {
        genre: Option<String>,
        release_date: Option<String>,
        url: Option<String>,
        country: Option<String>,
    },
    Lastfm {
        playcount: Option<u64>,
        listeners: Option<u64>,
        url: Option<String>,
    },
    Musicbrainz {
        release_date: Option<String>,
        release_id: Option<String>,
        status: Option<String>,
    },
}

impl ChartDetails {
    /// Classify an untyped `additional_info` blob by the keys it carries.
    pub fn from_json(raw: &str) -> Option<ChartDetails> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;

        let text = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        // Last.fm reports counts as strings ("12345")
        let count = |key: &str| -> Option<u64> {
            match obj.get(key)? {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };

        if obj.contains_key("itunes_url") {
            Some(ChartDetails::Itunes {
                genre: text("genre"),
                release_date: text("release_date"),
                url: text("itunes_url"),
                country: text("country"),
            })
        } else if obj.contains_key("playcount") || obj.contains_key("listeners") {
            Some(ChartDetails::Lastfm {
                playcount: count("playcount"),
                listeners: count("listeners"),
                url: text("lastfm_url"),
            })
        } else if obj.contains_key("musicbrainz_id") {
            Some(ChartDetails::Musicbrainz {
                release_date: text("release_date"),
                release_id: text("musicbrainz_id"),
                status: text("status"),
            })
        } else {
            None
        }
    }
}

// ============================================================================
// Normalized Records
// ============================================================================

/// Engagement numbers from the video platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub duration_seconds: Option<u64>,
}

impl EngagementMetrics {
    /// Number of populated metrics (0-4)
    pub fn populated(&self) -> usize {
        [
            self.views.is_some(),
            self.likes.is_some(),
            self.comments.is_some(),
            self.duration_seconds.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    /// Fill every missing metric from `other`.
    pub fn fill_from(&mut self, other: &EngagementMetrics) {
        self.views = self.views.or(other.views);
        self.likes = self.likes.or(other.likes);
        self.comments = self.comments.or(other.comments);
        self.duration_seconds = self.duration_seconds.or(other.duration_seconds);
    }
}

/// A record in the common schema.
///
/// `track_name` and `artist_name` are never empty: records that would
/// normalize to an empty title or artist are rejected as malformed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable provenance key, e.g. "chart:Hot 100:2024-05-01#3@0" or "video:dQw4w9WgXcQ"
    pub id: String,
    pub track_name: String,
    pub artist_name: String,
    pub source: Source,
    pub chart_name: Option<String>,
    pub chart_position: Option<i64>,
    pub chart_date: Option<String>,
    pub engagement_metrics: Option<EngagementMetrics>,
    pub chart_details: Option<ChartDetails>,
    pub original_title: String,
    pub original_artist: String,
}

impl NormalizedRecord {
    /// Completeness score used to rank merge bases: populated fields among
    /// the engagement metrics, `chart_name` and `chart_position`.
    pub fn completeness(&self) -> usize {
        let metrics = self
            .engagement_metrics
            .as_ref()
            .map_or(0, EngagementMetrics::populated);
        metrics + usize::from(self.chart_name.is_some()) + usize::from(self.chart_position.is_some())
    }
}

/// Final output: one record per real-world song.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    /// Base record with the cluster's field union applied.
    /// `record.source` is the source of the member chosen as base.
    #[serde(flatten)]
    pub record: NormalizedRecord,
    /// Ids of every normalized record folded into this one, in cluster order
    pub merged_from: Vec<String>,
}

impl From<NormalizedRecord> for UnifiedRecord {
    fn from(record: NormalizedRecord) -> Self {
        let merged_from = vec![record.id.clone()];
        UnifiedRecord {
            record,
            merged_from,
        }
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Anything the duplicate detector can compare.
pub trait Matchable {
    fn title(&self) -> &str;
    fn artist(&self) -> &str;
}

impl Matchable for NormalizedRecord {
    fn title(&self) -> &str {
        &self.track_name
    }

    fn artist(&self) -> &str {
        &self.artist_name
    }
}

impl Matchable for UnifiedRecord {
    fn title(&self) -> &str {
        &self.record.track_name
    }

    fn artist(&self) -> &str {
        &self.record.artist_name
    }
}

/// How a pair score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Title similarity alone
    TitleOnly,
    /// Weighted title + artist similarity
    TitleAndArtist,
}

/// Scored pair of record indices (`left < right`) that met the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCandidate {
    pub left: usize,
    pub right: usize,
    pub score: f64,
    pub strategy: MatchStrategy,
}

/// Connected component of duplicate edges.
///
/// `members` are indices into the slice given to the detector, ascending.
/// Singleton clusters represent records with no duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub members: Vec<usize>,
}

impl DuplicateCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-run counts for the reporting collaborator.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifyStats {
    // Input
    pub chart_received: usize,
    pub chart_malformed: usize,
    pub video_received: usize,
    pub video_malformed: usize,
    pub unparseable_durations: usize,

    // Duplicates removed per pass
    pub chart_duplicates_removed: usize,
    pub video_duplicates_removed: usize,
    pub cross_source_duplicates_removed: usize,

    // Output
    pub final_count: usize,
}

impl UnifyStats {
    /// Records that entered clustering (received minus malformed)
    pub fn total_input(&self) -> usize {
        (self.chart_received - self.chart_malformed) + (self.video_received - self.video_malformed)
    }

    pub fn total_duplicates_removed(&self) -> usize {
        self.chart_duplicates_removed
            + self.video_duplicates_removed
            + self.cross_source_duplicates_removed
    }

    /// Share of clustered input that survived as unified records, in percent
    pub fn retained_pct(&self) -> f64 {
        let input = self.total_input();
        if input == 0 {
            0.0
        } else {
            100.0 * self.final_count as f64 / input as f64
        }
    }

    /// Log stats at info level in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            log::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
