pub mod config;
pub mod context;
pub mod filler;
pub mod orchestrator;
pub mod sink;
pub mod stream;

pub use config::{FillerConfig, DEFAULT_FILLER_PROMPT};
pub use context::build_speculative_context;
pub use filler::{FillerOutcome, FillerState, FillerTask, FillerWaiter};
pub use orchestrator::{TurnHandle, TurnOrchestrator};
pub use sink::{SpeechSink, SpeechStream};
