pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{LLMError, LLMProvider, LLMStream};
pub use providers::OpenAICompatProvider;
pub use types::{LLMChunk, TokenUsage};
