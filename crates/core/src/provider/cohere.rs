//! Cohere chat adapter (v2 API, `command-r-plus`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{Completion, ProviderAdapter};

const COHERE_API_URL: &str = "https://api.cohere.com/v2/chat";
const MODEL: &str = "command-r-plus";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response fields are all optional on purpose: the adapter owns the shape
/// probing so the engine never has to.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    usage: Option<UsageEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<Vec<ContentBlock>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageEnvelope {
    tokens: Option<TokenCounts>,
    billed_units: Option<TokenCounts>,
}

#[derive(Debug, Deserialize)]
struct TokenCounts {
    input_tokens: Option<f64>,
    output_tokens: Option<f64>,
}

impl TokenCounts {
    fn total(&self) -> u32 {
        (self.input_tokens.unwrap_or(0.0) + self.output_tokens.unwrap_or(0.0)) as u32
    }
}

pub struct CohereProvider {
    client: reqwest::Client,
    api_key: String,
    temperature: f32,
}

impl CohereProvider {
    pub fn new(api_key: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            temperature,
        }
    }
}

#[async_trait]
impl ProviderAdapter for CohereProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(COHERE_API_URL)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;

        let text = parsed
            .message
            .and_then(|m| m.content)
            .and_then(|blocks| blocks.into_iter().find_map(|b| b.text))
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        let tokens = parsed
            .usage
            .map(|u| {
                u.tokens
                    .map(|t| t.total())
                    .or_else(|| u.billed_units.map(|t| t.total()))
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        debug!("Cohere call succeeded: tokens={tokens}");
        Ok(Completion { text, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_v2_shape() {
        let body = r#"{
            "message": {"content": [{"type": "text", "text": "[\"rust\"]"}]},
            "usage": {"tokens": {"input_tokens": 12, "output_tokens": 8}}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .message
            .and_then(|m| m.content)
            .and_then(|blocks| blocks.into_iter().find_map(|b| b.text))
            .unwrap();
        assert_eq!(text, "[\"rust\"]");
        assert_eq!(parsed.usage.unwrap().tokens.unwrap().total(), 20);
    }

    #[test]
    fn test_response_parsing_billed_units_fallback() {
        let body = r#"{
            "message": {"content": [{"type": "text", "text": "ok"}]},
            "usage": {"billed_units": {"input_tokens": 5, "output_tokens": 3}}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let usage = parsed.usage.unwrap();
        assert!(usage.tokens.is_none());
        assert_eq!(usage.billed_units.unwrap().total(), 8);
    }

    #[test]
    fn test_missing_usage_parses() {
        let body = r#"{"message": {"content": [{"type": "text", "text": "ok"}]}}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
    }
}
