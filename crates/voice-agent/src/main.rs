use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use voice_agent::console::run_console;
use voice_agent::logging::init_logging;
use voice_agent::{start_metrics_server, AppState, ConsoleSpeechSink, VoiceSession};
use voice_llm::{LLMProvider, OpenAICompatProvider};
use voice_turn::{FillerConfig, SpeechSink};

#[derive(Parser, Debug, Clone)]
#[command(name = "voice-agent")]
#[command(about = "Voice agent with speculative filler responses")]
#[command(version)]
struct Cli {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Metrics server port
    #[arg(long, env = "PORT", default_value = "8000")]
    port: u16,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.groq.com/openai/v1")]
    llm_base_url: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY")]
    api_key: String,

    /// Model for the main reply
    #[arg(long, env = "LLM_MODEL", default_value = "llama-3.3-70b-versatile")]
    model: String,

    /// Fast model for the filler reply
    #[arg(long, env = "FILLER_MODEL", default_value = "llama-3.1-8b-instant")]
    filler_model: String,

    /// Prior conversation items the filler model sees
    #[arg(long, env = "FILLER_CONTEXT_ITEMS", default_value = "3")]
    filler_context_items: usize,

    /// Give up on a filler after this many milliseconds (0 waits indefinitely)
    #[arg(long, env = "FILLER_TIMEOUT_MS", default_value = "0")]
    filler_timeout_ms: u64,

    /// Record empty filler replies in the conversation
    #[arg(long, env = "APPEND_EMPTY_FILLER", default_value = "false")]
    append_empty_filler: bool,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

impl Cli {
    fn filler_config(&self) -> FillerConfig {
        FillerConfig {
            max_context_items: self.filler_context_items,
            filler_timeout: (self.filler_timeout_ms > 0)
                .then(|| Duration::from_millis(self.filler_timeout_ms)),
            append_empty_filler: self.append_empty_filler,
            ..FillerConfig::default()
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.log_level.is_some() {
        env_logger::init();
    } else {
        init_logging(cli.debug);
    }

    log::info!("Starting voice agent, metrics on port {}", cli.port);
    log::info!("LLM Configuration:");
    log::info!("  Base URL: {}", cli.llm_base_url);
    log::info!("  Model: {}", cli.model);
    log::info!("  Filler model: {}", cli.filler_model);

    let state = AppState::new();
    let server = start_metrics_server(cli.port, state.clone())?;

    let main_llm: Arc<dyn LLMProvider> = Arc::new(
        OpenAICompatProvider::new(cli.api_key.clone())
            .with_base_url(cli.llm_base_url.clone())
            .with_model(cli.model.clone()),
    );
    let filler_llm: Arc<dyn LLMProvider> = Arc::new(
        OpenAICompatProvider::new(cli.api_key.clone())
            .with_base_url(cli.llm_base_url.clone())
            .with_model(cli.filler_model.clone()),
    );

    let session = VoiceSession::start(
        &state,
        main_llm,
        filler_llm,
        |bus| Arc::new(ConsoleSpeechSink::stdout().with_metrics(bus)) as Arc<dyn SpeechSink>,
        cli.filler_config(),
        voice_agent::DEFAULT_SYSTEM_PROMPT,
    );

    let turns = run_console(&session, tokio::io::stdin()).await;
    log::info!("[{}] Console closed after {} turns", session.id(), turns);

    session.shutdown().await;
    server.stop(true).await;
    Ok(())
}
