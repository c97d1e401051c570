use std::time::Duration;

pub const DEFAULT_FILLER_PROMPT: &str = "Generate a very short instant response to the user's message with 5 to 10 words.\nDo not answer the questions directly. Examples: OK, Hm..., let me think about that, wait a moment, that's a good question, etc.";

/// Configuration for the speculative filler turn.
#[derive(Debug, Clone)]
pub struct FillerConfig {
    /// System prompt placed first in the speculative context.
    pub system_prompt: String,
    /// How many prior conversation items the fast model gets to see.
    pub max_context_items: usize,
    /// Give up on the filler after this long. `None` waits for the stream,
    /// the turn's cancel token, or the sink dropping the stream.
    pub filler_timeout: Option<Duration>,
    /// Append an assistant message even when the fast model produced no text.
    pub append_empty_filler: bool,
    /// Label on the LLM sample emitted for each filler generation.
    pub metrics_label: String,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_FILLER_PROMPT.to_string(),
            max_context_items: 3,
            filler_timeout: None,
            append_empty_filler: false,
            metrics_label: "filler".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filler_config_default() {
        let config = FillerConfig::default();
        assert_eq!(config.max_context_items, 3);
        assert!(config.filler_timeout.is_none());
        assert!(!config.append_empty_filler);
        assert!(config.system_prompt.contains("5 to 10 words"));
    }
}
