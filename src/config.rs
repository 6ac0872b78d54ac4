//! Run configuration for the unifier.
//!
//! Every tuning knob the pipeline uses lives here and is passed explicitly;
//! nothing is read from process-wide state.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, UnifyError};
use crate::models::{MatchStrategy, Source};

/// Default duplicate threshold on the combined similarity score
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

pub const DEFAULT_TITLE_WEIGHT: f64 = 0.6;
pub const DEFAULT_ARTIST_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyConfig {
    /// Pairs scoring at or above this are duplicates
    pub similarity_threshold: f64,
    pub title_weight: f64,
    pub artist_weight: f64,
    /// Wins merge-base ties on completeness
    pub preferred_source: Source,
    pub match_strategy: MatchStrategy,
    /// Only score pairs whose titles share a token
    pub blocking: bool,
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            title_weight: DEFAULT_TITLE_WEIGHT,
            artist_weight: DEFAULT_ARTIST_WEIGHT,
            preferred_source: Source::Video,
            match_strategy: MatchStrategy::TitleAndArtist,
            blocking: true,
        }
    }
}

impl UnifyConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: UnifyConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(UnifyError::InvalidConfig(format!(
                "similarity_threshold must be in (0, 1], got {}",
                t
            )));
        }
        if !(self.title_weight >= 0.0 && self.artist_weight >= 0.0) {
            return Err(UnifyError::InvalidConfig(
                "weights must be non-negative".to_string(),
            ));
        }
        if self.title_weight + self.artist_weight <= 0.0 {
            return Err(UnifyError::InvalidConfig(
                "title_weight + artist_weight must be positive".to_string(),
            ));
        }
        // Titles carry more signal than artist names
        if self.title_weight < self.artist_weight {
            return Err(UnifyError::InvalidConfig(format!(
                "title_weight ({}) must not be below artist_weight ({})",
                self.title_weight, self.artist_weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = UnifyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.preferred_source, Source::Video);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: UnifyConfig =
            serde_json::from_str(r#"{"similarity_threshold": 0.9, "blocking": false}"#).unwrap();
        assert_eq!(config.similarity_threshold, 0.9);
        assert!(!config.blocking);
        assert_eq!(config.title_weight, DEFAULT_TITLE_WEIGHT);
        assert_eq!(config.match_strategy, MatchStrategy::TitleAndArtist);
    }

    #[test]
    fn test_enum_fields_snake_case() {
        let config: UnifyConfig = serde_json::from_str(
            r#"{"preferred_source": "chart", "match_strategy": "title_only"}"#,
        )
        .unwrap();
        assert_eq!(config.preferred_source, Source::Chart);
        assert_eq!(config.match_strategy, MatchStrategy::TitleOnly);
    }

    #[test]
    fn test_invalid_threshold() {
        for t in [0.0, -0.1, 1.5, f64::NAN] {
            let config = UnifyConfig {
                similarity_threshold: t,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "threshold {} accepted", t);
        }
    }

    #[test]
    fn test_artist_weight_above_title_rejected() {
        let config = UnifyConfig {
            title_weight: 0.3,
            artist_weight: 0.7,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not be below"));
    }
}
