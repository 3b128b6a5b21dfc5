//! Embedding and completion providers used by the chat deflection pipeline.

pub mod openai;
pub mod prompt;
pub mod similarity;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AiConfig;

pub use openai::OpenAiProvider;
pub use similarity::cosine_similarity;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("AI provider is not configured")]
    NotConfigured,
    #[error("request to AI provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("AI provider response was malformed: {0}")]
    MalformedResponse(String),
    #[error("AI provider did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Produces a free-text answer for a fully rendered prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Stand-in used when no provider URL is configured. Every call fails, which
/// the pipeline treats as "could not answer".
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredProvider;

#[async_trait]
impl EmbeddingProvider for UnconfiguredProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// Embedding and completion handles resolved from configuration.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub completer: Arc<dyn CompletionProvider>,
}

pub fn providers_from_config(config: &AiConfig) -> Result<Providers, ProviderError> {
    match config.base_url.as_deref() {
        Some(base_url) => {
            let provider = Arc::new(OpenAiProvider::new(base_url, config)?);
            tracing::info!(
                base_url = %base_url,
                completion_model = %config.completion_model,
                embedding_model = %config.embedding_model,
                "Using OpenAI-compatible AI provider"
            );
            Ok(Providers {
                embedder: provider.clone(),
                completer: provider,
            })
        }
        None => {
            tracing::warn!("AI provider not configured, chat queries will open tickets");
            let provider = Arc::new(UnconfiguredProvider);
            Ok(Providers {
                embedder: provider.clone(),
                completer: provider,
            })
        }
    }
}
