//! SQLite adapter over the collection database.
//!
//! Collectors write `chart_data` and `youtube_videos`; the unified output
//! goes to a replaceable table in the same file (default
//! `cleaned_music_data`).

use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::{params, Connection, Row};
use std::path::Path;

use crate::models::{ChartDetails, ChartRecord, UnifiedRecord, VideoRecord};
use crate::progress::{create_progress_bar, log_progress};

pub const DEFAULT_OUTPUT_TABLE: &str = "cleaned_music_data";

const WRITE_BATCH_SIZE: usize = 1_000;

/// Collector schema, as created by the collection jobs.
const SOURCE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chart_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track_name TEXT,
        artist_name TEXT,
        position INTEGER,
        chart_name TEXT,
        chart_date TEXT,
        additional_info TEXT
    );

    CREATE TABLE IF NOT EXISTS youtube_videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT UNIQUE NOT NULL,
        title TEXT,
        channel_title TEXT,
        published_at TEXT,
        view_count INTEGER,
        like_count INTEGER,
        comment_count INTEGER,
        duration TEXT,
        tags TEXT,
        category_id TEXT
    );";

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn check_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("Invalid table name '{}'", table);
    }
    Ok(())
}

/// Negative counts from a bad import are treated as missing.
fn count_column(row: &Row, idx: usize) -> rusqlite::Result<Option<u64>> {
    let value: Option<i64> = row.get(idx)?;
    Ok(value.and_then(|v| u64::try_from(v).ok()))
}

fn parse_tags(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the collector tables if missing.
    pub fn create_source_schema(&self) -> Result<()> {
        self.conn.execute_batch(SOURCE_SCHEMA)?;
        Ok(())
    }

    fn count_rows(&self, table: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count as u64)
    }

    /// All chart rows in insertion order.
    pub fn load_chart_records(&self) -> Result<Vec<ChartRecord>> {
        let total = self.count_rows("chart_data")?;
        let pb = create_progress_bar(total, "Reading chart_data");

        let mut stmt = self.conn.prepare(
            "SELECT track_name, artist_name, position, chart_name, chart_date, additional_info
             FROM chart_data ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::with_capacity(total as usize);
        while let Some(row) = rows.next()? {
            let additional: Option<String> = row.get(5)?;
            records.push(ChartRecord {
                track_name: row.get(0)?,
                artist_name: row.get(1)?,
                position: row.get(2)?,
                chart_name: row.get(3)?,
                chart_date: row.get(4)?,
                additional_data: additional.as_deref().and_then(ChartDetails::from_json),
            });
            pb.inc(1);
            log_progress("chart_data", records.len() as u64, total, 10_000);
        }

        pb.finish_with_message(format!("Read {} chart records", records.len()));
        Ok(records)
    }

    /// All video rows in insertion order.
    pub fn load_video_records(&self) -> Result<Vec<VideoRecord>> {
        let total = self.count_rows("youtube_videos")?;
        let pb = create_progress_bar(total, "Reading youtube_videos");

        let mut stmt = self.conn.prepare(
            "SELECT video_id, title, channel_title, published_at, view_count, like_count,
                    comment_count, duration, tags, category_id
             FROM youtube_videos ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::with_capacity(total as usize);
        while let Some(row) = rows.next()? {
            records.push(VideoRecord {
                video_id: row.get(0)?,
                title: row.get(1)?,
                channel_title: row.get(2)?,
                published_at: row.get(3)?,
                view_count: count_column(row, 4)?,
                like_count: count_column(row, 5)?,
                comment_count: count_column(row, 6)?,
                duration: row.get(7)?,
                tags: parse_tags(row.get(8)?),
                category_id: row.get(9)?,
            });
            pb.inc(1);
            log_progress("youtube_videos", records.len() as u64, total, 10_000);
        }

        pb.finish_with_message(format!("Read {} video records", records.len()));
        Ok(records)
    }

    /// Replace `table` with `records`.
    ///
    /// Rows go to a staging table in batched transactions; the swap into
    /// `table` is a single transaction, so a failed write leaves the previous
    /// output untouched.
    pub fn save_unified(&mut self, records: &[UnifiedRecord], table: &str) -> Result<()> {
        check_table_name(table)?;
        let staging = format!("{}_staging", table);

        if let Err(e) = self.write_rows(records, &staging) {
            // Leftover staging rows are useless once a batch failed
            let _ = self
                .conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {};", staging));
            return Err(e.context(format!("Failed to write unified records to {}", table)));
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             ALTER TABLE {staging} RENAME TO {table};",
            table = table,
            staging = staging
        ))?;
        tx.commit()?;

        info!("Wrote {} unified records to table {}", records.len(), table);
        Ok(())
    }

    fn write_rows(&mut self, records: &[UnifiedRecord], table: &str) -> Result<()> {
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                 id TEXT PRIMARY KEY,
                 track_name TEXT NOT NULL,
                 artist_name TEXT NOT NULL,
                 source TEXT NOT NULL,
                 chart_name TEXT,
                 chart_position INTEGER,
                 chart_date TEXT,
                 views INTEGER,
                 likes INTEGER,
                 comments INTEGER,
                 duration_seconds INTEGER,
                 chart_details TEXT,
                 original_title TEXT NOT NULL,
                 original_artist TEXT NOT NULL,
                 merged_from TEXT NOT NULL
             );",
            table = table
        ))?;

        let insert = format!(
            "INSERT INTO {} (id, track_name, artist_name, source, chart_name, chart_position,
                 chart_date, views, likes, comments, duration_seconds, chart_details,
                 original_title, original_artist, merged_from)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            table
        );

        let pb = create_progress_bar(records.len() as u64, "Writing unified records");
        let mut written = 0u64;

        for chunk in records.chunks(WRITE_BATCH_SIZE) {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(&insert)?;
                for unified in chunk {
                    let r = &unified.record;
                    let metrics = r.engagement_metrics.clone().unwrap_or_default();
                    let details = r
                        .chart_details
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()?;
                    // SQLite integers are signed
                    let as_sql = |v: Option<u64>| v.and_then(|v| i64::try_from(v).ok());

                    stmt.execute(params![
                        r.id,
                        r.track_name,
                        r.artist_name,
                        r.source.as_str(),
                        r.chart_name,
                        r.chart_position,
                        r.chart_date,
                        as_sql(metrics.views),
                        as_sql(metrics.likes),
                        as_sql(metrics.comments),
                        as_sql(metrics.duration_seconds),
                        details,
                        r.original_title,
                        r.original_artist,
                        serde_json::to_string(&unified.merged_from)?,
                    ])
                    .with_context(|| format!("Failed to insert {}", r.id))?;
                    pb.inc(1);
                    written += 1;
                    log_progress("write", written, records.len() as u64, 10_000);
                }
            }
            tx.commit()?;
        }

        pb.finish_with_message(format!("Wrote {} records", records.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngagementMetrics, NormalizedRecord, Source};

    fn store() -> RecordStore {
        let store = RecordStore::from_connection(Connection::open_in_memory().unwrap());
        store.create_source_schema().unwrap();
        store
    }

    #[test]
    fn test_load_chart_records() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO chart_data (track_name, artist_name, position, chart_name, chart_date, additional_info)
                 VALUES ('Song', 'Artist', 1, 'Hot 100', '2024-05-01', '{\"playcount\": \"42\"}'),
                        (NULL, 'Artist', NULL, 'Hot 100', NULL, NULL)",
                [],
            )
            .unwrap();

        let records = store.load_chart_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].track_name.as_deref(), Some("Song"));
        assert_eq!(records[0].position, Some(1));
        assert_eq!(
            records[0].additional_data,
            Some(ChartDetails::Lastfm {
                playcount: Some(42),
                listeners: None,
                url: None,
            })
        );
        assert_eq!(records[1].track_name, None);
        assert_eq!(records[1].additional_data, None);
    }

    #[test]
    fn test_load_video_records() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO youtube_videos (video_id, title, channel_title, view_count, like_count,
                     comment_count, duration, tags, category_id)
                 VALUES ('abc', 'Artist - Song', 'Chan', 100, -1, NULL, 'PT3M', '[\"pop\",\"live\"]', '10'),
                        ('def', 'Other', NULL, NULL, NULL, NULL, NULL, 'not json', NULL)",
                [],
            )
            .unwrap();

        let records = store.load_video_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].video_id, "abc");
        assert_eq!(records[0].view_count, Some(100));
        assert_eq!(records[0].like_count, None);
        assert_eq!(records[0].tags, vec!["pop", "live"]);
        assert_eq!(records[0].duration.as_deref(), Some("PT3M"));
        assert!(records[1].tags.is_empty());
        assert_eq!(records[1].channel_title, None);
    }

    fn unified_record(id: &str) -> NormalizedRecord {
        NormalizedRecord {
            id: id.to_string(),
            track_name: "Song".to_string(),
            artist_name: "Artist".to_string(),
            source: Source::Video,
            chart_name: Some("Hot 100".to_string()),
            chart_position: Some(4),
            chart_date: None,
            engagement_metrics: Some(EngagementMetrics {
                views: Some(100),
                ..Default::default()
            }),
            chart_details: None,
            original_title: "Artist - Song (Official Video)".to_string(),
            original_artist: "Chan".to_string(),
        }
    }

    #[test]
    fn test_save_unified_replaces_table() {
        let mut store = store();
        let mut unified = UnifiedRecord::from(unified_record("video:abc"));
        unified.merged_from.push("chart:Hot 100:#4".to_string());

        store.save_unified(&[unified.clone()], "unified_out").unwrap();
        store.save_unified(&[unified], "unified_out").unwrap();

        let conn = store.connection();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM unified_out", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let (source, position, views, likes, merged): (String, i64, i64, Option<i64>, String) = conn
            .query_row(
                "SELECT source, chart_position, views, likes, merged_from FROM unified_out",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .unwrap();
        assert_eq!(source, "video");
        assert_eq!(position, 4);
        assert_eq!(views, 100);
        assert_eq!(likes, None);
        assert_eq!(merged, r#"["video:abc","chart:Hot 100:#4"]"#);
    }

    #[test]
    fn test_failed_write_keeps_previous_table() {
        let mut store = store();
        let first = UnifiedRecord::from(unified_record("video:abc"));
        store.save_unified(&[first], "unified_out").unwrap();

        // Colliding ids fail the insert after the first row
        let dup = vec![
            UnifiedRecord::from(unified_record("video:new")),
            UnifiedRecord::from(unified_record("video:new")),
        ];
        let err = store.save_unified(&dup, "unified_out").unwrap_err();
        assert!(err.to_string().contains("unified_out"));

        let conn = store.connection();
        let ids: Vec<String> = conn
            .prepare("SELECT id FROM unified_out")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(ids, vec!["video:abc"]);

        let staging: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'unified_out_staging'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(staging, 0);
    }

    #[test]
    fn test_invalid_table_name() {
        let mut store = store();
        assert!(store.save_unified(&[], "out; DROP TABLE chart_data").is_err());
        assert!(store.save_unified(&[], "1table").is_err());
        assert!(store.save_unified(&[], "").is_err());
    }
}
