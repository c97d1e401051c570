pub mod console;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod session;
pub mod sink;
pub mod state;

pub use console::run_console;
pub use server::{app_config, start_metrics_server};
pub use session::{TurnReport, VoiceSession, DEFAULT_SYSTEM_PROMPT};
pub use sink::ConsoleSpeechSink;
pub use state::AppState;
