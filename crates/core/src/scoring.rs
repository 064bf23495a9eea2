//! Scoring engine — readability, semantic relevance, and reading-level fit.
//!
//! Every function here is deterministic for a fixed embedder and total: any
//! degenerate input or embedding failure resolves to the 50.0 neutral default
//! instead of an error. Provider tokens are never spent in this module.

use tracing::warn;

use crate::analysis::state::ReadingLevel;
use crate::config::ScoringConfig;
use crate::embeddings::Embedder;

/// Neutral score substituted whenever a metric cannot be computed.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Score granted when readability sits inside the level's preferred band.
const IN_BAND_SCORE: f64 = 90.0;

/// Per-unit penalty for readability distance outside the band.
const BAND_DISTANCE_PENALTY: f64 = 0.8;

/// Flesch reading ease, clamped to [0, 100].
///
/// `206.835 − 1.015·(words/sentences) − 84.6·(syllables/words)`, with a
/// vowel-group syllable heuristic. Empty or degenerate text (no words, no
/// sentences) scores the neutral default.
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .collect();
    let sentences = count_sentences(text);

    if words.is_empty() || sentences == 0 {
        return NEUTRAL_SCORE;
    }

    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;

    let score = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    score.clamp(0.0, 100.0)
}

fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|segment| segment.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// Vowel-group syllable count: consecutive vowels collapse to one syllable,
/// a trailing silent 'e' is dropped, and every word has at least one.
fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0;
    let mut prev_vowel = false;
    for &c in &letters {
        let v = is_vowel(c);
        if v && !prev_vowel {
            groups += 1;
        }
        prev_vowel = v;
    }

    if groups > 1 && letters.last() == Some(&'e') {
        groups -= 1;
    }
    groups.max(1)
}

/// Maximum cosine similarity between the draft and any preferred topic,
/// remapped from [-1, 1] to [0, 100]. Empty topics and embedding failures
/// both resolve to the neutral default.
pub async fn keyword_relevance(embedder: &dyn Embedder, text: &str, topics: &[String]) -> f64 {
    if topics.is_empty() {
        return NEUTRAL_SCORE;
    }

    let draft_vec = match embedder.embed(text).await {
        Ok(v) => v,
        Err(e) => {
            warn!("Draft embedding failed, using neutral relevance: {e}");
            return NEUTRAL_SCORE;
        }
    };

    let mut max_similarity = f32::NEG_INFINITY;
    for topic in topics {
        match embedder.embed(topic).await {
            Ok(topic_vec) => {
                max_similarity = max_similarity.max(cosine_similarity(&draft_vec, &topic_vec));
            }
            Err(e) => {
                warn!("Topic embedding failed, using neutral relevance: {e}");
                return NEUTRAL_SCORE;
            }
        }
    }

    ((max_similarity as f64 + 1.0) / 2.0) * 100.0
}

/// How well a readability score fits the preferred band for a reading level.
///
/// Inside the band scores a flat 90.0. Outside, the score drops by 0.8 per
/// point of distance, floored at the per-direction floor constants (the two
/// floors differ on purpose — see `ScoringConfig`). Levels with no configured
/// band score the neutral default.
pub fn profile_fit(cfg: &ScoringConfig, readability: f64, level: ReadingLevel) -> f64 {
    let band = match cfg.bands.get(&level) {
        Some(b) => b,
        None => return NEUTRAL_SCORE,
    };

    if readability >= band.min && readability <= band.max {
        IN_BAND_SCORE
    } else if readability < band.min {
        let distance = band.min - readability;
        (IN_BAND_SCORE - distance * BAND_DISTANCE_PENALTY).max(cfg.fit_floor_below)
    } else {
        let distance = readability - band.max;
        (IN_BAND_SCORE - distance * BAND_DISTANCE_PENALTY).max(cfg.fit_floor_above)
    }
}

/// The blended relevance score: keyword relevance, readability, and profile
/// fit combined by the configured weights, clamped to [0, 100].
pub async fn relevance_score(
    cfg: &ScoringConfig,
    embedder: &dyn Embedder,
    text: &str,
    topics: &[String],
    level: ReadingLevel,
) -> f64 {
    let relevance = keyword_relevance(embedder, text, topics).await;
    let readability = flesch_reading_ease(text);
    let fit = profile_fit(cfg, readability, level);

    let blended = relevance * cfg.weights.keyword_relevance
        + readability * cfg.weights.readability
        + fit * cfg.weights.user_profile;
    blended.clamp(0.0, 100.0)
}

/// Cosine similarity; 0.0 for zero-norm or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
