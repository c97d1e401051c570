use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Cancelled")]
    Cancelled,
}
