//! Draftpilot core — the resilient analysis pipeline behind blog keyword
//! recommendations.
//!
//! Flow: analyze_draft → generate_keywords → calculate_scores → format_output.
//! Every LLM call goes through a `ProviderAdapter` wrapped in the backoff
//! executor; every raw model response goes through the normalizer before the
//! pipeline sees it. Scoring is pure and deterministic.
//!
//! The HTTP transport that serves these operations lives outside this crate —
//! callers construct an [`AnalysisEngine`] and invoke
//! [`AnalysisEngine::process_recommendation_request`] or
//! [`AnalysisEngine::analyze_single_text`] directly.

pub mod analysis;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod retry;
pub mod scoring;

pub use analysis::pipeline::AnalysisEngine;
pub use analysis::state::{
    AnalysisState, DraftAnalysis, ReadingLevel, Recommendation, Sentiment, TextAnalysis,
};
pub use config::{Band, ScoreWeights, ScoringConfig, Settings};
pub use embeddings::{create_embedder, Embedder, HashEmbedder, OpenAiEmbedder};
pub use error::{EngineError, ProviderError};
pub use provider::{Completion, ProviderAdapter};
