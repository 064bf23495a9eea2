//! Provider adapters — the single seam between the engine and any LLM API.
//!
//! ARCHITECTURAL RULE: the pipeline only ever sees `(text, tokens)` through
//! the [`ProviderAdapter`] trait. All response-shape variance between vendors
//! lives inside the concrete adapters; none of it leaks into the core.
//!
//! Adapters issue exactly ONE request per call. Retrying is the backoff
//! executor's job, and it wraps every adapter call the engine makes.

use async_trait::async_trait;

use crate::error::ProviderError;

pub mod cohere;
pub mod openai;

pub use cohere::CohereProvider;
pub use openai::OpenAiProvider;

/// One completed prompt: the model's text and the tokens it billed.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens: u32,
}

/// A single prompt-completion capability. Concrete providers implement this;
/// the engine is generic over which one is plugged in.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderError>;
}
