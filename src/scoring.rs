//! Similarity scoring for duplicate detection.
//!
//! This module contains:
//! - The character-level sequence ratio between two normalized strings
//! - The weighted title/artist pair score
//! - Title tokenization for the blocking index

use crate::config::UnifyConfig;
use crate::models::{Matchable, MatchStrategy};

// ============================================================================
// Sequence Ratio
// ============================================================================

/// LCS length using two-row DP.
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity of two normalized strings in [0, 1]: 2·LCS / (|a| + |b|),
/// case-insensitive, over characters.
///
/// Symmetric and reflexive; two empty strings score 1.0, one empty string
/// against a non-empty one scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let matches = lcs_length(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

// ============================================================================
// Pair Scoring
// ============================================================================

/// Score breakdown for one record pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub title: f64,
    /// None when the artist was not compared
    pub artist: Option<f64>,
    pub combined: f64,
    pub strategy: MatchStrategy,
}

/// Weighted title/artist similarity for a pair of records.
///
/// Falls back to title-only when the config asks for it or when either side
/// has no artist, so an empty artist never counts as a match.
pub fn score_pair<A: Matchable + ?Sized, B: Matchable + ?Sized>(
    a: &A,
    b: &B,
    config: &UnifyConfig,
) -> PairScore {
    let title = similarity(a.title(), b.title());

    let compare_artists = config.match_strategy == MatchStrategy::TitleAndArtist
        && !a.artist().is_empty()
        && !b.artist().is_empty();

    if !compare_artists {
        return PairScore {
            title,
            artist: None,
            combined: title,
            strategy: MatchStrategy::TitleOnly,
        };
    }

    let artist = similarity(a.artist(), b.artist());
    let weight_sum = config.title_weight + config.artist_weight;
    let combined = (config.title_weight * title + config.artist_weight * artist) / weight_sum;

    PairScore {
        title,
        artist: Some(artist),
        combined,
        strategy: MatchStrategy::TitleAndArtist,
    }
}

// ============================================================================
// Blocking
// ============================================================================

/// Lowercased alphanumeric tokens of a title, deduplicated, sorted.
pub fn title_tokens(title: &str) -> Vec<String> {
    let mut tokens: Vec<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(&'static str, &'static str);

    impl Matchable for Pair {
        fn title(&self) -> &str {
            self.0
        }
        fn artist(&self) -> &str {
            self.1
        }
    }

    const CORPUS: &[&str] = &[
        "",
        "a",
        "Song Title",
        "song title",
        "Title Song",
        "Hello",
        "Helo",
        "Bohemian Rhapsody",
        "Bohemian Rhapsody - Remastered",
        "Café del Mar",
        "cafe del mar",
        "abcabcabc",
        "cba",
    ];

    #[test]
    fn test_similarity_reflexive() {
        for s in CORPUS {
            assert_eq!(similarity(s, s), 1.0, "similarity({:?}, itself)", s);
        }
    }

    #[test]
    fn test_similarity_symmetric() {
        for a in CORPUS {
            for b in CORPUS {
                assert_eq!(similarity(a, b), similarity(b, a), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_similarity_bounds() {
        for a in CORPUS {
            for b in CORPUS {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "{:?} vs {:?} = {}", a, b, s);
            }
        }
    }

    #[test]
    fn test_similarity_values() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("Song Title", "song title"), 1.0);
        // LCS("hello", "helo") = 4 → 8/9
        assert!((similarity("Hello", "Helo") - 8.0 / 9.0).abs() < 1e-12);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_score_pair_weighted() {
        let config = UnifyConfig::default();
        let score = score_pair(&Pair("Song", "Artist"), &Pair("Song", "Other"), &config);
        assert_eq!(score.title, 1.0);
        assert_eq!(score.strategy, MatchStrategy::TitleAndArtist);
        let artist = score.artist.unwrap();
        let expected = (0.6 + 0.4 * artist) / 1.0;
        assert!((score.combined - expected).abs() < 1e-12);
        assert!(score.combined < config.similarity_threshold);
    }

    #[test]
    fn test_score_pair_title_only() {
        let config = UnifyConfig {
            match_strategy: MatchStrategy::TitleOnly,
            ..Default::default()
        };
        let score = score_pair(&Pair("Song", "Artist"), &Pair("Song", "Other"), &config);
        assert_eq!(score.combined, 1.0);
        assert_eq!(score.artist, None);
        assert_eq!(score.strategy, MatchStrategy::TitleOnly);
    }

    #[test]
    fn test_score_pair_empty_artist_is_title_only() {
        let config = UnifyConfig::default();
        let score = score_pair(&Pair("Song", ""), &Pair("Song", "Artist"), &config);
        assert_eq!(score.strategy, MatchStrategy::TitleOnly);
    }

    #[test]
    fn test_score_pair_symmetric() {
        let config = UnifyConfig::default();
        let a = Pair("Bohemian Rhapsody", "Queen");
        let b = Pair("Bohemian Rhapsody - Remastered", "Queen Official");
        assert_eq!(
            score_pair(&a, &b, &config).combined,
            score_pair(&b, &a, &config).combined
        );
    }

    #[test]
    fn test_title_tokens() {
        assert_eq!(title_tokens("Don't Stop - Me Now!"), vec!["don", "me", "now", "stop", "t"]);
        assert_eq!(title_tokens("Song song SONG"), vec!["song"]);
        assert!(title_tokens("!!!").is_empty());
    }
}
