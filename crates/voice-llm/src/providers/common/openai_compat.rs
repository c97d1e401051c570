//! OpenAI-compatible request serialization helpers.
//!
//! OpenAI, Groq and most hosted inference APIs accept the chat completions
//! request/stream shape. These helpers build a "compat" JSON body without
//! leaking internal [`Message`] fields (like `id`, `interrupted` or `created_at`).

use serde::Deserialize;
use serde_json::{json, Value};
use voice_core::{Message, Role};

use crate::provider::Result;
use crate::types::{LLMChunk, TokenUsage};

/// Convert internal [`Message`] values to an OpenAI-compatible JSON array.
pub fn messages_to_openai_compat_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(tool_calls) = &m.tool_calls {
                msg["tool_calls"] = json!(tool_calls);
            }

            msg
        })
        .collect()
}

/// Build a streaming chat request body that also asks for a final usage chunk.
pub fn build_openai_compat_body(
    model: &str,
    messages: &[Message],
    max_output_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "stream": true,
        "stream_options": { "include_usage": true },
    });

    if let Some(max_tokens) = max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

// --- OpenAI-compatible streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct OpenAICompatStreamChunk {
    #[allow(dead_code)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAICompatChoice>,
    usage: Option<OpenAICompatUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatChoice {
    #[serde(default)]
    delta: OpenAICompatDelta,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAICompatDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Convert a single OpenAI-compatible stream chunk into an [`LLMChunk`].
///
/// The usage-only chunk sent with `include_usage` has no choices.
pub fn parse_openai_compat_chunk(chunk: OpenAICompatStreamChunk) -> LLMChunk {
    if let Some(choice) = chunk.choices.first() {
        if let Some(content) = &choice.delta.content {
            return LLMChunk::Token(content.clone());
        }
    }

    if let Some(usage) = chunk.usage {
        return LLMChunk::Usage(TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });
    }

    LLMChunk::Token(String::new())
}

/// Parse an SSE `data:` payload.
///
/// - `"[DONE]"` -> `LLMChunk::Done`
/// - Invalid JSON -> error
pub fn parse_openai_compat_sse_data(data: &str) -> Result<LLMChunk> {
    if data.trim() == "[DONE]" {
        return Ok(LLMChunk::Done);
    }

    let chunk: OpenAICompatStreamChunk = serde_json::from_str(data)?;
    Ok(parse_openai_compat_chunk(chunk))
}
