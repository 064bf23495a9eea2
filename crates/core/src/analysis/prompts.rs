// Prompt templates for every analysis task, tuned to keep token usage low
// while demanding JSON-only output. Inputs are truncated before formatting —
// the caps match what each task actually needs to see.

use serde_json::Value;

use crate::analysis::state::ReadingLevel;

/// Sentiment only needs the opening of the text.
const SENTIMENT_INPUT_CAP: usize = 1000;
/// Everything else gets a larger window.
const DEFAULT_INPUT_CAP: usize = 1500;

const SENTIMENT_PROMPT: &str = r#"Analyze sentiment of this blog text. Return JSON only:
{"polarity": float(-1 to 1), "subjectivity": float(0 to 1)}

Text: {text}"#;

const TOPIC_EXTRACTION_PROMPT: &str = r#"Extract 3-5 key topics from this blog. Return JSON array of strings only:
["topic1", "topic2", ...]

Text: {text}"#;

const KEYWORD_GENERATION_PROMPT: &str = r#"Generate 5-7 relevant keywords for this blog. Return JSON array only:
["keyword1", "keyword2", ...]

Text: {text}"#;

const KEYWORD_RECOMMENDATION_PROMPT: &str = r#"Given:
- Draft: {draft_text}
- Context: {cursor_context}
- User topics: {preferred_topics}
- Reading level: {reading_level}
- Past analysis: {historical_data}

Generate 8-10 ranked keywords optimized for user preferences. Return JSON array only:
["keyword1", "keyword2", ...]"#;

const DRAFT_ANALYSIS_PROMPT: &str = r#"Analyze this draft for content quality and structure. Return JSON:
{"quality_score": float(0-1), "structure_notes": "brief notes", "improvement_areas": ["area1", "area2"]}

Draft: {draft_text}"#;

pub fn sentiment_prompt(text: &str) -> String {
    SENTIMENT_PROMPT.replace("{text}", truncate(text, SENTIMENT_INPUT_CAP))
}

pub fn topic_extraction_prompt(text: &str) -> String {
    TOPIC_EXTRACTION_PROMPT.replace("{text}", truncate(text, DEFAULT_INPUT_CAP))
}

pub fn keyword_generation_prompt(text: &str) -> String {
    KEYWORD_GENERATION_PROMPT.replace("{text}", truncate(text, DEFAULT_INPUT_CAP))
}

pub fn keyword_recommendation_prompt(
    draft_text: &str,
    cursor_context: Option<&str>,
    preferred_topics: &[String],
    reading_level: ReadingLevel,
    historical_data: Option<&Value>,
) -> String {
    KEYWORD_RECOMMENDATION_PROMPT
        .replace("{draft_text}", truncate(draft_text, DEFAULT_INPUT_CAP))
        .replace("{cursor_context}", cursor_context.unwrap_or("None"))
        .replace("{preferred_topics}", &preferred_topics.join(", "))
        .replace("{reading_level}", &reading_level.to_string())
        .replace(
            "{historical_data}",
            &historical_data
                .map(|v| v.to_string())
                .unwrap_or_else(|| "None".to_string()),
        )
}

pub fn draft_analysis_prompt(draft_text: &str) -> String {
    DRAFT_ANALYSIS_PROMPT.replace("{draft_text}", truncate(draft_text, DEFAULT_INPUT_CAP))
}

/// Char-boundary-safe prefix of at most `max_chars` characters.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
