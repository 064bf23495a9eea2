//! Analysis orchestrator — the staged recommendation workflow.
//!
//! Flow: analyze_draft → generate_keywords → calculate_scores → format_output.
//! Stages run strictly in order over one owned [`AnalysisState`]. A stage
//! that ultimately fails records the error into the state and substitutes
//! defaults; downstream provider-backed stages see the error and pass
//! through, while the final backfill pass ALWAYS runs — so every invocation
//! terminates with non-empty keywords and non-zero scores, error or not.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::analysis::state::{
    AnalysisState, DraftAnalysis, ReadingLevel, Recommendation, TextAnalysis,
};
use crate::analysis::tasks;
use crate::config::Settings;
use crate::embeddings::Embedder;
use crate::error::EngineError;
use crate::provider::ProviderAdapter;
use crate::scoring;

/// Keywords substituted when a terminated pipeline would otherwise return none.
const BACKFILL_KEYWORDS: [&str; 2] = ["content", "blog"];
/// Keywords substituted when the generation stage itself fails.
const KEYWORD_STAGE_DEFAULTS: [&str; 3] = ["content", "blog", "article"];

/// The engine behind both public operations. Holds no per-request state:
/// each invocation owns its `AnalysisState` (and with it the token
/// accumulator), so concurrent invocations never interfere.
pub struct AnalysisEngine {
    provider: Arc<dyn ProviderAdapter>,
    embedder: Arc<dyn Embedder>,
    settings: Settings,
}

impl AnalysisEngine {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        embedder: Arc<dyn Embedder>,
        settings: Settings,
    ) -> Self {
        Self {
            provider,
            embedder,
            settings,
        }
    }

    /// Runs the full recommendation pipeline for one draft.
    ///
    /// Never fails: stage errors degrade to defaults and are reported through
    /// the `error` field of the returned [`Recommendation`].
    pub async fn process_recommendation_request(
        &self,
        draft_text: String,
        cursor_context: Option<String>,
        preferred_topics: Vec<String>,
        reading_level: ReadingLevel,
        historical_data: Option<Value>,
    ) -> Recommendation {
        // Fresh state per invocation — the token accumulator starts at zero
        // here, never carried over from a previous request.
        let mut state = AnalysisState::new(
            draft_text,
            cursor_context,
            preferred_topics,
            reading_level,
            historical_data,
        );

        self.analyze_draft_stage(&mut state).await;
        self.generate_keywords_stage(&mut state).await;
        self.calculate_scores_stage(&mut state).await;
        self.format_output_stage(&mut state);

        Recommendation {
            suggested_keywords: state.keywords,
            readability_score: state.readability_score,
            relevance_score: state.relevance_score,
            token_usage: state.token_usage,
            error: state.error,
        }
    }

    /// Standalone single-text analysis: sentiment, topics, and initial
    /// keywords via three independent provider calls. Unlike the pipeline,
    /// post-retry provider errors surface to the caller.
    pub async fn analyze_single_text(&self, text: &str) -> Result<TextAnalysis, EngineError> {
        let (sentiment, _) =
            tasks::analyze_sentiment(self.provider.as_ref(), &self.settings, text).await?;
        let (topics, _) =
            tasks::extract_topics(self.provider.as_ref(), &self.settings, text).await?;
        let (initial_keywords, _) =
            tasks::generate_initial_keywords(self.provider.as_ref(), &self.settings, text).await?;

        Ok(TextAnalysis {
            sentiment,
            topics,
            initial_keywords,
        })
    }

    async fn analyze_draft_stage(&self, state: &mut AnalysisState) {
        info!("Analyzing draft text");
        match tasks::analyze_draft(self.provider.as_ref(), &self.settings, &state.draft_text).await
        {
            Ok((analysis, tokens)) => {
                state.analysis_result = Some(analysis);
                state.add_tokens(tokens);
                info!("Draft analysis completed. Tokens used: {tokens}");
            }
            Err(e) => {
                error!("Error analyzing draft: {e}");
                state.record_error(format!("Draft analysis failed: {e}"));
                state.analysis_result = Some(DraftAnalysis::fallback());
            }
        }
    }

    async fn generate_keywords_stage(&self, state: &mut AnalysisState) {
        if state.error.is_some() {
            return;
        }

        info!("Generating keyword recommendations");
        match tasks::recommend_keywords(
            self.provider.as_ref(),
            &self.settings,
            &state.draft_text,
            state.cursor_context.as_deref(),
            &state.preferred_topics,
            state.reading_level,
            state.historical_data.as_ref(),
        )
        .await
        {
            Ok((keywords, tokens)) => {
                info!(
                    "Keywords generated: {} keywords. Tokens used: {tokens}",
                    keywords.len()
                );
                state.keywords = keywords;
                state.add_tokens(tokens);
            }
            Err(e) => {
                error!("Error generating keywords: {e}");
                state.record_error(format!("Keyword generation failed: {e}"));
                state.keywords = KEYWORD_STAGE_DEFAULTS.map(String::from).to_vec();
            }
        }
    }

    /// Pure scoring — no provider call, no token cost. The scoring engine
    /// resolves its own failures to neutral defaults, so this stage cannot
    /// itself record an error.
    async fn calculate_scores_stage(&self, state: &mut AnalysisState) {
        if state.error.is_some() {
            return;
        }

        info!("Calculating scores");
        state.readability_score = scoring::flesch_reading_ease(&state.draft_text);
        state.relevance_score = scoring::relevance_score(
            &self.settings.scoring,
            self.embedder.as_ref(),
            &state.draft_text,
            &state.preferred_topics,
            state.reading_level,
        )
        .await;
        info!(
            "Scores calculated - Readability: {:.2}, Relevance: {:.2}",
            state.readability_score, state.relevance_score
        );
    }

    /// Unconditional backfill pass — runs even when an earlier stage failed.
    /// Guarantees the terminated-state invariant: keywords non-empty and
    /// neither score left at zero.
    fn format_output_stage(&self, state: &mut AnalysisState) {
        info!("Formatting output");
        if state.keywords.is_empty() {
            state.keywords = BACKFILL_KEYWORDS.map(String::from).to_vec();
        }
        if state.readability_score == 0.0 {
            state.readability_score = scoring::NEUTRAL_SCORE;
        }
        if state.relevance_score == 0.0 {
            state.relevance_score = scoring::NEUTRAL_SCORE;
        }
    }
}
