use async_trait::async_trait;
use reqwest::Client;
use voice_core::Message;

use crate::provider::{LLMError, LLMProvider, LLMStream, Result};

use super::common::openai_compat::{build_openai_compat_body, parse_openai_compat_sse_data};
use super::common::sse::llm_stream_from_sse;

/// Streaming chat client for any OpenAI-compatible endpoint (OpenAI, Groq, ...).
pub struct OpenAICompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: Option<u32>,
}

impl OpenAICompatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            max_output_tokens: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    async fn chat_stream(&self, messages: &[Message]) -> Result<LLMStream> {
        let body = build_openai_compat_body(&self.model, messages, self.max_output_tokens);

        log::debug!(
            "[{}] chat request with {} messages",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(LLMError::Api(format!("HTTP {}: {}", status, text)));
        }

        let stream = llm_stream_from_sse(response, |_event, data| {
            if data.trim().is_empty() {
                return Ok(None);
            }

            parse_openai_compat_sse_data(data).map(Some)
        });

        Ok(stream)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
