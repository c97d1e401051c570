pub mod agent;

pub use agent::context::{ConversationContext, SharedContext};
pub use agent::error::VoiceError;
pub use agent::types::{FunctionCall, Message, Role, ToolCall};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
