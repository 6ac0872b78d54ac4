//! Title and artist normalization shared by every source.
//!
//! The output is both the display form of a record and the input to
//! similarity scoring, so case is preserved; scoring lowercases on its own.
//!
//! Both entry points are total and idempotent: each cleanup pass is repeated
//! until the string stops changing, so a removal that exposes a new noise
//! segment (e.g. "(Official (HD) Video)") is handled within the same call.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// ENCODING REPAIR
// ============================================================================

/// UTF-8 text that was decoded as cp1252, mapped back to the intended character.
/// Applied in order: the bare "â€" catch-all must stay last.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â€™", "\u{2019}"),
    ("â€˜", "\u{2018}"),
    ("â€œ", "\u{201C}"),
    ("â€\u{9D}", "\u{201D}"),
    ("â€\u{201C}", "\u{2013}"),
    ("â€\u{201D}", "\u{2014}"),
    ("â€¦", "\u{2026}"),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ãª", "ê"),
    ("Ã¡", "á"),
    ("Ã\u{A0}", "à"),
    ("Ã¢", "â"),
    ("Ã\u{AD}", "í"),
    ("Ã³", "ó"),
    ("Ã´", "ô"),
    ("Ãº", "ú"),
    ("Ã±", "ñ"),
    ("Ã§", "ç"),
    ("Ã¤", "ä"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("Ã‰", "É"),
    ("Â\u{A0}", " "),
    ("â€", "\""),
];

/// Replace known mojibake sequences with the character they stand for.
pub fn repair_encoding(s: &str) -> String {
    if !s.contains(['â', 'Ã', 'Â']) {
        return s.to_string();
    }
    MOJIBAKE
        .iter()
        .fold(s.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

/// Fold curly quotes and stray accents to their ASCII forms.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}'], "'") // Left/right single curly quotes
        .replace(['\u{201C}', '\u{201D}'], "\"") // Left/right double curly quotes
        .replace('\u{00B4}', "'") // Acute accent used as apostrophe
}

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Promotional/annotation segments removed from titles.
/// Each pattern only matches a whole parenthesized or bracketed segment.
pub static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "(Official Video)", "[Official Music Video]", "(Official HD Video)", "(Official Lyric Video)"
        Regex::new(r"(?i)\s*[\(\[]\s*official\s+(?:hd\s+|4k\s+)?(?:music\s+|lyric\s+)?video\s*[\)\]]").unwrap(),
        // "(Official Audio)", "(Official Visualizer)"
        Regex::new(r"(?i)\s*[\(\[]\s*official\s+(?:audio|visuali[sz]er)\s*[\)\]]").unwrap(),
        // "(Music Video)", "(Lyric Video)", "(Lyrics)", "[Lyric]"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:music\s+video|lyrics?\s+video|lyrics?)\s*[\)\]]").unwrap(),
        // "(Audio)", "(Audio Only)", "(Visualizer)"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:audio(?:\s+only)?|visuali[sz]er)\s*[\)\]]").unwrap(),
        // Quality tags: "(HD)", "[HQ]", "(4K)"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:hd|hq|4k)\s*[\)\]]").unwrap(),
        // Remaster tags: "(Remastered)", "[2011 Remaster]", "(Remastered 2009)"
        Regex::new(r"(?i)\s*[\(\[]\s*(?:remaster(?:ed)?(?:\s+\d{4})?|\d{4}\s+remaster(?:ed)?)\s*[\)\]]").unwrap(),
    ]
});

/// Channel markers trailing a title: "Song - Topic", "Song - Official"
pub static TITLE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+[-–—]\s+(?:topic|official)$").unwrap());

/// Auto-generated channel marker: "Artist - Topic"
pub static TOPIC_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*[-–—]\s*topic$").unwrap());

/// Featuring variants: "ft", "ft.", "feat", "featuring"
pub static FEATURING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:featuring|feat|ft)\b\.?").unwrap());

/// Collaboration separators: "A & B" → "A and B"
pub static AMPERSAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+&\s+").unwrap());

/// Lowercase " x " joins a guest artist: "A x B" → "A feat. B".
/// Uppercase X is left alone ("Lil Nas X").
pub static CROSS_FEATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+x\s+").unwrap());

/// Versus variants: "vs", "Vs.", "VS" → "vs."
pub static VERSUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+vs\.?\s+").unwrap());

/// Separators left dangling after a suffix is removed
const EDGE_SEPARATORS: &[char] = &[' ', '-', '–', '—', '|'];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Collapse runs of whitespace into one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Encoding repair, NFKC folding and punctuation cleanup shared by both
/// title and artist passes.
fn clean_text(s: &str) -> String {
    let repaired = repair_encoding(s);
    let folded: String = repaired.nfkc().collect();
    normalize_punctuation(&folded)
}

/// Apply `pass` until the output stops changing.
///
/// Title passes only remove text once NFKC has run, and artist passes only
/// rewrite tokens into forms they no longer match, so this terminates.
fn settle(raw: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = pass(raw);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

fn title_pass(s: &str) -> String {
    let mut result = clean_text(s);

    for pattern in TITLE_PATTERNS.iter() {
        result = pattern.replace_all(&result, " ").to_string();
    }

    result = collapse_whitespace(&result);
    result = TITLE_SUFFIX.replace(&result, "").to_string();

    result.trim_matches(EDGE_SEPARATORS).to_string()
}

/// Normalize a title: strip promotional segments, repair encoding, collapse whitespace.
///
/// e.g. "Song Title (Official Music Video)" → "Song Title"
pub fn normalize_title(raw: &str) -> String {
    settle(raw, title_pass)
}

fn artist_pass(s: &str) -> String {
    let mut result = collapse_whitespace(&clean_text(s));

    result = TOPIC_SUFFIX.replace(&result, "").to_string();
    result = FEATURING.replace_all(&result, "feat.").to_string();
    result = CROSS_FEATURE.replace_all(&result, " feat. ").to_string();
    result = AMPERSAND.replace_all(&result, " and ").to_string();
    result = VERSUS.replace_all(&result, " vs. ").to_string();

    collapse_whitespace(&result)
}

/// Normalize an artist name: canonical "feat.", "and" and "vs." joiners,
/// no " - Topic" suffix.
///
/// e.g. "Artist ft. Other" → "Artist feat. Other"
pub fn normalize_artist(raw: &str) -> String {
    settle(raw, artist_pass)
}

// ============================================================================
// TESTS
// ============================================================================
