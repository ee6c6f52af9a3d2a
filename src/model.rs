//! Model dispatch: send the assembled messages, get one reply back

use crate::config::ModelConfig;
use crate::error::{MemoryError, Result};
use crate::types::ChatMessage;
use async_trait::async_trait;
use std::time::Duration;

/// Anything that can answer a chat transcript
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Reply text for `messages`. An empty reply is an error.
    async fn send(&self, messages: &[ChatMessage]) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-style `/chat/completions` endpoint (LM Studio, vLLM,
/// llama.cpp server, ...)
pub struct OpenAiCompatibleClient {
    config: ModelConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("api_url", &self.config.api_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| MemoryError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        tracing::debug!(
            url = %self.config.api_url,
            messages = messages.len(),
            "Dispatching chat completion"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MemoryError::Dispatch(format!("{status}: {error_text}")));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| MemoryError::Dispatch("response has no message content".to_string()))?
            .trim();

        if content.is_empty() {
            return Err(MemoryError::Dispatch("model returned an empty reply".to_string()));
        }

        Ok(content.to_string())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
