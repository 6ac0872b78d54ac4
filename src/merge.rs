//! Merge a duplicate cluster into one unified record.
//!
//! Base selection ranks members by (completeness, source priority); the
//! first member in cluster order wins a full tie. Every field the base lacks
//! is then filled from the remaining members, so no populated field in the
//! cluster is lost.

use log::debug;

use crate::error::{Result, UnifyError};
use crate::models::{DuplicateCluster, Source, UnifiedRecord};

/// Rank key for base selection: higher is better.
fn base_rank(record: &UnifiedRecord, preferred: Source) -> (usize, bool) {
    (record.record.completeness(), record.record.source == preferred)
}

/// Index (into `cluster.members`) of the member that becomes the base.
fn select_base(cluster: &DuplicateCluster, members: &[UnifiedRecord], preferred: Source) -> usize {
    let mut best = 0;
    let mut best_rank = base_rank(&members[cluster.members[0]], preferred);
    for (pos, &idx) in cluster.members.iter().enumerate().skip(1) {
        let rank = base_rank(&members[idx], preferred);
        // Strictly better only: ties keep the earlier member
        if rank > best_rank {
            best = pos;
            best_rank = rank;
        }
    }
    best
}

/// Copy every field `donor` has and `base` lacks.
fn fill_missing(base: &mut UnifiedRecord, donor: &UnifiedRecord) {
    let (target, from) = (&mut base.record, &donor.record);

    if target.chart_name.is_none() {
        target.chart_name = from.chart_name.clone();
    }
    if target.chart_position.is_none() {
        target.chart_position = from.chart_position;
    }
    if target.chart_date.is_none() {
        target.chart_date = from.chart_date.clone();
    }
    if target.chart_details.is_none() {
        target.chart_details = from.chart_details.clone();
    }
    match (&mut target.engagement_metrics, &from.engagement_metrics) {
        (Some(mine), Some(theirs)) => mine.fill_from(theirs),
        (None, Some(theirs)) => target.engagement_metrics = Some(theirs.clone()),
        _ => {}
    }
}

/// Resolve a cluster into a single record.
///
/// `members` maps each index in `cluster.members` to its record. The base
/// member supplies `track_name`, `artist_name`, `source` and the original
/// strings; other fields are unioned. Provenance ids are concatenated in
/// cluster order. A singleton cluster returns its member unchanged.
pub fn resolve(
    cluster: &DuplicateCluster,
    members: &[UnifiedRecord],
    preferred: Source,
) -> Result<UnifiedRecord> {
    if cluster.is_empty() {
        return Err(UnifyError::EmptyCluster);
    }
    if cluster.is_singleton() {
        return Ok(members[cluster.members[0]].clone());
    }

    let base_pos = select_base(cluster, members, preferred);
    let mut merged = members[cluster.members[base_pos]].clone();

    for (pos, &idx) in cluster.members.iter().enumerate() {
        if pos != base_pos {
            fill_missing(&mut merged, &members[idx]);
        }
    }

    merged.merged_from = cluster
        .members
        .iter()
        .flat_map(|&idx| members[idx].merged_from.iter().cloned())
        .collect();

    debug!(
        "Merged {} records into '{}' by '{}' (base {})",
        cluster.len(),
        merged.record.track_name,
        merged.record.artist_name,
        merged.record.id
    );
    Ok(merged)
}
