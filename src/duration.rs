//! ISO-8601 video durations ("PT4M13S") to whole seconds.
//!
//! This crate owns the conversion; collectors hand over the raw string.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, UnifyError};

/// `P[nD][T[nH][nM][nS]]`, integer components only
pub static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap()
});

/// Parse an ISO-8601 duration into seconds.
///
/// "P" and "PT" without components are rejected, as is anything with
/// fractional seconds or year/month designators.
pub fn parse_iso_duration(raw: &str) -> Result<u64> {
    let s = raw.trim();
    let unparseable = || UnifyError::UnparseableDuration(raw.to_string());

    let caps = ISO_DURATION.captures(s).ok_or_else(unparseable)?;
    if s == "P" || s.ends_with('T') {
        return Err(unparseable());
    }

    let mut total: u64 = 0;
    for (idx, unit) in [(1, 86_400u64), (2, 3_600), (3, 60), (4, 1)] {
        if let Some(m) = caps.get(idx) {
            let value: u64 = m.as_str().parse().map_err(|_| unparseable())?;
            total = value
                .checked_mul(unit)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(unparseable)?;
        }
    }
    Ok(total)
}
