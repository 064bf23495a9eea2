use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::state::ReadingLevel;

/// Engine configuration, passed in once at construction and never mutated.
/// Every field has a documented default; `from_env` only overrides what the
/// environment actually sets.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Retries on top of the initial attempt (so `3` means up to 4 calls).
    pub max_retries: u32,
    /// First inter-attempt delay; doubles on each subsequent attempt.
    pub base_delay: Duration,
    /// Token budget handed to the provider when a task has no cap of its own.
    pub max_tokens: u32,
    pub temperature: f32,
    pub scoring: ScoringConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_tokens: 2000,
            temperature: 0.3,
            scoring: ScoringConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the environment, falling back to defaults for
    /// anything unset. Reads `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut settings = Settings::default();
        if let Some(n) = env_parse::<u32>("DRAFTPILOT_MAX_RETRIES") {
            settings.max_retries = n;
        }
        if let Some(ms) = env_parse::<u64>("DRAFTPILOT_BASE_DELAY_MS") {
            settings.base_delay = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<u32>("DRAFTPILOT_MAX_TOKENS") {
            settings.max_tokens = n;
        }
        if let Some(t) = env_parse::<f32>("DRAFTPILOT_TEMPERATURE") {
            settings.temperature = t;
        }
        settings
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Blend weights for the final relevance score.
///
/// CONFIGURATION CONTRACT: the weights are expected to sum to 1.0 but this is
/// not enforced. If an operator changes them, the final clamp to [0,100] in
/// `relevance_score` is the only guard against out-of-range blends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub keyword_relevance: f64,
    pub readability: f64,
    pub user_profile: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword_relevance: 0.4,
            readability: 0.3,
            user_profile: 0.3,
        }
    }
}

/// Preferred readability range for a reading level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// Per-level preferred readability bands. A level absent from the map has
    /// no band and scores a flat 50.0 in `profile_fit`.
    pub bands: HashMap<ReadingLevel, Band>,
    /// Floor for the profile-fit score when readability falls below the band.
    /// Intentionally NOT the same as `fit_floor_above`; the asymmetry is
    /// inherited product behavior and must not be unified without guidance.
    pub fit_floor_below: f64,
    /// Floor for the profile-fit score when readability exceeds the band.
    pub fit_floor_above: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut bands = HashMap::new();
        bands.insert(ReadingLevel::Beginner, Band { min: 60.0, max: 100.0 });
        bands.insert(ReadingLevel::Intermediate, Band { min: 40.0, max: 80.0 });
        bands.insert(ReadingLevel::Advanced, Band { min: 0.0, max: 60.0 });

        Self {
            weights: ScoreWeights::default(),
            bands,
            fit_floor_below: 10.9,
            fit_floor_above: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        let sum = w.keyword_relevance + w.readability + w.user_profile;
        assert!((sum - 1.0).abs() < f64::EPSILON, "Sum was {sum}");
    }

    #[test]
    fn test_default_bands_cover_all_levels() {
        let cfg = ScoringConfig::default();
        assert!(cfg.bands.contains_key(&ReadingLevel::Beginner));
        assert!(cfg.bands.contains_key(&ReadingLevel::Intermediate));
        assert!(cfg.bands.contains_key(&ReadingLevel::Advanced));
    }

    #[test]
    fn test_fit_floors_are_distinct() {
        let cfg = ScoringConfig::default();
        assert!(cfg.fit_floor_below != cfg.fit_floor_above);
    }

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert_eq!(s.max_retries, 3);
        assert_eq!(s.base_delay, Duration::from_secs(1));
        assert_eq!(s.max_tokens, 2000);
    }
}
