use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target audience reading level, used to select a preferred readability band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::fmt::Display for ReadingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadingLevel::Beginner => "beginner",
            ReadingLevel::Intermediate => "intermediate",
            ReadingLevel::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// Sentiment metrics extracted from one text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

impl Sentiment {
    /// Neutral default used when the model response is unrecoverable.
    pub fn fallback() -> Self {
        Self {
            polarity: 0.0,
            subjectivity: 0.5,
        }
    }
}

/// Quality/structure assessment of a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftAnalysis {
    pub quality_score: f64,
    pub structure_notes: String,
    pub improvement_areas: Vec<String>,
}

impl DraftAnalysis {
    pub fn fallback() -> Self {
        Self {
            quality_score: 0.5,
            structure_notes: "Unable to analyze".to_string(),
            improvement_areas: vec!["clarity".to_string()],
        }
    }
}

/// The record threaded through the recommendation pipeline.
///
/// One instance per invocation, owned by the pipeline run — the token
/// accumulator lives here precisely so concurrent invocations can never
/// corrupt each other's counts. `error` is first-write-wins: once a stage
/// records a failure, later stages pass through and only the backfill runs.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub draft_text: String,
    pub cursor_context: Option<String>,
    pub preferred_topics: Vec<String>,
    pub reading_level: ReadingLevel,
    pub historical_data: Option<Value>,
    pub analysis_result: Option<DraftAnalysis>,
    pub keywords: Vec<String>,
    pub readability_score: f64,
    pub relevance_score: f64,
    pub token_usage: u32,
    pub error: Option<String>,
}

impl AnalysisState {
    pub fn new(
        draft_text: String,
        cursor_context: Option<String>,
        preferred_topics: Vec<String>,
        reading_level: ReadingLevel,
        historical_data: Option<Value>,
    ) -> Self {
        Self {
            draft_text,
            cursor_context,
            preferred_topics,
            reading_level,
            historical_data,
            analysis_result: None,
            keywords: Vec::new(),
            readability_score: 0.0,
            relevance_score: 0.0,
            token_usage: 0,
            error: None,
        }
    }

    /// Records a stage failure. Only the FIRST error per invocation sticks.
    pub fn record_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    pub fn add_tokens(&mut self, tokens: u32) {
        self.token_usage = self.token_usage.saturating_add(tokens);
    }
}

/// Final projection of a recommendation run, handed back to the caller.
/// Structurally valid even on failure: keywords are never empty and scores
/// are never zero once the pipeline terminates.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub suggested_keywords: Vec<String>,
    pub readability_score: f64,
    pub relevance_score: f64,
    pub token_usage: u32,
    pub error: Option<String>,
}

/// Result of the standalone single-text analysis (sentiment + topics +
/// initial keywords), independent of the staged pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct TextAnalysis {
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub initial_keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_level_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReadingLevel::Beginner).unwrap(),
            "\"beginner\""
        );
        let level: ReadingLevel = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(level, ReadingLevel::Advanced);
    }

    #[test]
    fn test_first_error_wins() {
        let mut state = AnalysisState::new(
            "draft".to_string(),
            None,
            vec![],
            ReadingLevel::Beginner,
            None,
        );
        state.record_error("first".to_string());
        state.record_error("second".to_string());
        assert_eq!(state.error.as_deref(), Some("first"));
    }

    #[test]
    fn test_token_accumulator_only_increases() {
        let mut state = AnalysisState::new(
            "draft".to_string(),
            None,
            vec![],
            ReadingLevel::Beginner,
            None,
        );
        state.add_tokens(10);
        state.add_tokens(0);
        state.add_tokens(u32::MAX);
        assert_eq!(state.token_usage, u32::MAX);
    }
}
