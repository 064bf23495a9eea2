//! One function per provider-backed analysis task.
//!
//! Each task builds its prompt, runs the adapter call through the backoff
//! executor, and normalizes the raw response against a task-specific
//! fallback. A task can only fail with a provider error after retries
//! exhaust — model responses that fail to parse degrade to the fallback
//! value instead of failing.

use serde_json::Value;
use tracing::debug;

use crate::analysis::prompts;
use crate::analysis::state::{DraftAnalysis, ReadingLevel, Sentiment};
use crate::config::Settings;
use crate::error::ProviderError;
use crate::normalize::normalize_into;
use crate::provider::ProviderAdapter;
use crate::retry::execute_with_backoff;

const SENTIMENT_MAX_TOKENS: u32 = 50;
const TOPICS_MAX_TOKENS: u32 = 100;
const KEYWORDS_MAX_TOKENS: u32 = 100;
const RECOMMENDATION_MAX_TOKENS: u32 = 150;
const DRAFT_ANALYSIS_MAX_TOKENS: u32 = 200;

async fn complete_with_retry(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    prompt: &str,
    max_tokens: u32,
) -> Result<crate::provider::Completion, ProviderError> {
    execute_with_backoff(
        || provider.complete(prompt, max_tokens),
        settings.max_retries,
        settings.base_delay,
    )
    .await
}

pub async fn analyze_sentiment(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    text: &str,
) -> Result<(Sentiment, u32), ProviderError> {
    let prompt = prompts::sentiment_prompt(text);
    let completion =
        complete_with_retry(provider, settings, &prompt, SENTIMENT_MAX_TOKENS).await?;
    debug!("Raw sentiment response: {:?}", completion.text);
    let sentiment = normalize_into(&completion.text, &Sentiment::fallback());
    Ok((sentiment, completion.tokens))
}

pub async fn extract_topics(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    text: &str,
) -> Result<(Vec<String>, u32), ProviderError> {
    let prompt = prompts::topic_extraction_prompt(text);
    let completion = complete_with_retry(provider, settings, &prompt, TOPICS_MAX_TOKENS).await?;
    let topics = normalize_into(&completion.text, &vec!["general".to_string()]);
    Ok((topics, completion.tokens))
}

pub async fn generate_initial_keywords(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    text: &str,
) -> Result<(Vec<String>, u32), ProviderError> {
    let prompt = prompts::keyword_generation_prompt(text);
    let completion = complete_with_retry(provider, settings, &prompt, KEYWORDS_MAX_TOKENS).await?;
    let keywords = normalize_into(
        &completion.text,
        &vec!["content".to_string(), "blog".to_string()],
    );
    Ok((keywords, completion.tokens))
}

pub async fn recommend_keywords(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    draft_text: &str,
    cursor_context: Option<&str>,
    preferred_topics: &[String],
    reading_level: ReadingLevel,
    historical_data: Option<&Value>,
) -> Result<(Vec<String>, u32), ProviderError> {
    let prompt = prompts::keyword_recommendation_prompt(
        draft_text,
        cursor_context,
        preferred_topics,
        reading_level,
        historical_data,
    );
    let completion =
        complete_with_retry(provider, settings, &prompt, RECOMMENDATION_MAX_TOKENS).await?;
    let keywords = normalize_into(
        &completion.text,
        &vec!["keyword".to_string(), "content".to_string()],
    );
    Ok((keywords, completion.tokens))
}

pub async fn analyze_draft(
    provider: &dyn ProviderAdapter,
    settings: &Settings,
    draft_text: &str,
) -> Result<(DraftAnalysis, u32), ProviderError> {
    let prompt = prompts::draft_analysis_prompt(draft_text);
    let completion =
        complete_with_retry(provider, settings, &prompt, DRAFT_ANALYSIS_MAX_TOKENS).await?;
    let analysis = normalize_into(&completion.text, &DraftAnalysis::fallback());
    Ok((analysis, completion.tokens))
}
