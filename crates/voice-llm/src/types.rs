use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// One item of a streamed chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMChunk {
    Token(String),
    /// Reported once, near the end of the stream, by providers that support it.
    Usage(TokenUsage),
    Done,
}
