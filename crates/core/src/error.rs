use thiserror::Error;

/// A failed call to an LLM provider or embedding endpoint.
///
/// These are the only errors the backoff executor retries. Response-shape
/// trouble inside otherwise-successful completions is NOT an error — the
/// normalizer resolves it to a fallback value locally and never raises.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors the engine surfaces to its caller.
///
/// `process_recommendation_request` never returns one of these — degraded
/// defaults are baked into the response instead. `analyze_single_text` does,
/// after retries exhaust, for the transport layer to map.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
