use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use voice_core::Message;

use crate::types::LLMChunk;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Finite, non-restartable stream of completion chunks. May fail mid-stream.
pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMChunk>> + Send>>;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stream a chat completion for `messages`.
    async fn chat_stream(&self, messages: &[Message]) -> Result<LLMStream>;

    /// Model name used for log and metrics attribution.
    fn model(&self) -> &str;
}
