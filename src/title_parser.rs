//! Split a freeform video title into (artist, track).
//!
//! Video platforms deliver a single title string; chart sources already
//! separate the two fields and never go through here.

use once_cell::sync::Lazy;
use regex::Regex;

/// Dash separators tried first: "Artist - Track" (plus en/em dash variants)
const DASH_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

/// Colon separator: "Artist: Track"
const COLON_SEPARATOR: &str = ": ";

/// Quoted title: `Artist "Track"`, straight or curly quotes
pub static QUOTED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(.+?)\s*["\u{201C}](.+?)["\u{201D}]\s*$"#).unwrap());

/// Split on the first occurrence of `sep`, requiring both sides non-empty.
fn split_pair(title: &str, sep: &str) -> Option<(String, String)> {
    let (left, right) = title.split_once(sep)?;
    non_empty_pair(left, right)
}

fn non_empty_pair(left: &str, right: &str) -> Option<(String, String)> {
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        None
    } else {
        Some((left.to_string(), right.to_string()))
    }
}

fn split_dash(title: &str) -> Option<(String, String)> {
    // Earliest dash of any style wins so "A – B - C" splits after "A"
    DASH_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep).map(|pos| (pos, *sep)))
        .min_by_key(|(pos, _)| *pos)
        .and_then(|(pos, sep)| non_empty_pair(&title[..pos], &title[pos + sep.len()..]))
}

fn split_quoted(title: &str) -> Option<(String, String)> {
    let caps = QUOTED_TITLE.captures(title)?;
    non_empty_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

/// Derive (artist, track) from a title.
///
/// Tries " - ", then ": ", then `Artist "Track"`; the first that yields two
/// non-empty parts wins. Otherwise the whole title is the track and
/// `fallback_channel` is the artist. Never fails.
pub fn extract_artist_track(title: &str, fallback_channel: &str) -> (String, String) {
    split_dash(title)
        .or_else(|| split_pair(title, COLON_SEPARATOR))
        .or_else(|| split_quoted(title))
        .unwrap_or_else(|| (fallback_channel.to_string(), title.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, t: &str) -> (String, String) {
        (a.to_string(), t.to_string())
    }

    #[test]
    fn test_dash_separator() {
        assert_eq!(extract_artist_track("Artist - Song Title", "Chan"), pair("Artist", "Song Title"));
        assert_eq!(
            extract_artist_track("Artist - Song - Live", "Chan"),
            pair("Artist", "Song - Live")
        );
        assert_eq!(extract_artist_track("Artist – Song", "Chan"), pair("Artist", "Song"));
        assert_eq!(extract_artist_track("A – B - C", "Chan"), pair("A", "B - C"));
    }

    #[test]
    fn test_colon_separator() {
        assert_eq!(extract_artist_track("Artist: Song", "Chan"), pair("Artist", "Song"));
    }

    #[test]
    fn test_dash_beats_colon() {
        assert_eq!(
            extract_artist_track("Band: Live - Encore", "Chan"),
            pair("Band: Live", "Encore")
        );
    }

    #[test]
    fn test_quoted_title() {
        assert_eq!(extract_artist_track("Artist \"Song\"", "Chan"), pair("Artist", "Song"));
        assert_eq!(
            extract_artist_track("Artist \u{201C}Song\u{201D}", "Chan"),
            pair("Artist", "Song")
        );
    }

    #[test]
    fn test_empty_side_falls_through() {
        // Dash with nothing on the left, no other pattern
        assert_eq!(extract_artist_track(" - Song", "Chan"), pair("Chan", "- Song"));
        assert_eq!(extract_artist_track("Song -", "Chan"), pair("Chan", "Song -"));
        // Empty dash split, but the colon pattern still applies
        assert_eq!(extract_artist_track(" - Intro: Title", "Chan"), pair("- Intro", "Title"));
    }

    #[test]
    fn test_fallback_to_channel() {
        assert_eq!(
            extract_artist_track("Weird Title With No Separator", "SomeChannel"),
            pair("SomeChannel", "Weird Title With No Separator")
        );
        assert_eq!(extract_artist_track("", "SomeChannel"), pair("SomeChannel", ""));
        // Hyphenated words are not separators
        assert_eq!(extract_artist_track("Jay-Z Song", "Chan"), pair("Chan", "Jay-Z Song"));
    }
}
