//! Embedding backends for semantic relevance scoring.
//!
//! The scoring engine only needs `embed(text) -> Vec<f32>`; which backend
//! provides it is an environment decision. Failures here never surface past
//! the scoring engine — relevance degrades to its 50.0 default instead.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI embeddings API
// ────────────────────────────────────────────────────────────────────────────

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .context("Failed to build reqwest client for embeddings")?;

        let dims = match model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };

        Ok(Self {
            client,
            api_key,
            model,
            dims,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    /// Single attempt, no retry: an embedding failure degrades the relevance
    /// score to its default upstream rather than stalling the pipeline.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Generating embedding (model={}, chars={})",
            self.model,
            text.len()
        );

        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error {status}: {error_text}");
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("Embedding response contained no data")
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic hash embedder (offline / tests)
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic, network-free embedder: a SHA-256-seeded unit vector per
/// token bag. Similar texts share tokens and therefore vector mass, which is
/// enough structure for relevance scoring to stay meaningful offline and
/// fully reproducible under test.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0_f32; self.dims];
        for token in text.to_lowercase().split_whitespace() {
            let digest = Sha256::digest(token.as_bytes());
            let mut idx_bytes = [0u8; 8];
            idx_bytes.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(idx_bytes) as usize) % self.dims;
            // Signed contribution so unrelated texts can land near zero.
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            out[idx] += sign;
        }

        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Factory
// ────────────────────────────────────────────────────────────────────────────

/// Picks an embedder from the environment: OpenAI when a key is set (or
/// `DRAFTPILOT_EMBED_PROVIDER=openai` forces it), deterministic hash
/// embedder otherwise.
pub fn create_embedder() -> Result<Arc<dyn Embedder>> {
    let provider = std::env::var("DRAFTPILOT_EMBED_PROVIDER").unwrap_or_default();
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

    match provider.as_str() {
        "openai" => {
            if api_key.trim().is_empty() {
                anyhow::bail!("DRAFTPILOT_EMBED_PROVIDER=openai but OPENAI_API_KEY is not set");
            }
            let model = std::env::var("DRAFTPILOT_EMBED_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "text-embedding-3-small".to_string());
            info!("Using OpenAI embeddings (model={model})");
            Ok(Arc::new(OpenAiEmbedder::new(api_key, model)?))
        }
        "hash" => {
            info!("Using deterministic hash embeddings");
            Ok(Arc::new(HashEmbedder::default()))
        }
        _ => {
            if !api_key.trim().is_empty() {
                info!("Using OpenAI embeddings (model=text-embedding-3-small)");
                Ok(Arc::new(OpenAiEmbedder::new(
                    api_key,
                    "text-embedding-3-small".to_string(),
                )?))
            } else {
                info!("No embedding API key found; using deterministic hash embeddings");
                Ok(Arc::new(HashEmbedder::default()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("rust async runtimes").await.unwrap();
        let b = embedder.embed("rust async runtimes").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedder_unit_norm() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("a blog post about databases").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "Norm was {norm}");
    }

    #[tokio::test]
    async fn test_hash_embedder_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(v.len(), embedder.dimensions());
    }

    #[tokio::test]
    async fn test_shared_tokens_raise_similarity() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("rust memory safety").await.unwrap();
        let b = embedder.embed("rust memory model").await.unwrap();
        let c = embedder.embed("sourdough hydration ratios").await.unwrap();
        let sim_ab: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        let sim_ac: f32 = a.iter().zip(&c).map(|(x, y)| x * y).sum();
        assert!(sim_ab > sim_ac, "{sim_ab} vs {sim_ac}");
    }
}
