//! OpenAI-compatible HTTP provider (`/embeddings` and `/chat/completions`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, EmbeddingProvider, ProviderError};
use crate::config::AiConfig;

/// Longest error body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    completion_model: String,
    embedding_model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, config: &AiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            completion_model: config.completion_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response: EmbeddingResponse = self
            .post_json(
                "embeddings",
                &EmbeddingRequest {
                    model: &self.embedding_model,
                    input: text,
                },
            )
            .await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding returned".to_string()))?;

        if embedding.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "empty embedding returned".to_string(),
            ));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let response: ChatResponse = self
            .post_json(
                "chat/completions",
                &ChatRequest {
                    model: &self.completion_model,
                    messages: [ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: 0.0,
                },
            )
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::MalformedResponse("no completion returned".to_string()))
    }
}
