pub mod context;
pub mod error;
pub mod types;

pub use context::{ConversationContext, SharedContext};
pub use error::VoiceError;
pub use types::{FunctionCall, Message, Role, ToolCall};
