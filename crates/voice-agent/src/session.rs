use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use voice_core::{ConversationContext, Message, SharedContext, VoiceError};
use voice_llm::{LLMChunk, LLMProvider};
use voice_metrics::{
    ConversationMarker, EventMeta, LlmSample, MetricsAggregator, MetricsBus, MetricsError,
    MetricsWorker, SharedAggregator, UsageRecord, UsageSummaryReporter,
};
use voice_turn::{FillerConfig, FillerOutcome, SpeechSink, TurnOrchestrator};

use crate::state::AppState;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful voice assistant. Keep answers short and conversational; they will be spoken aloud.";

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What one user turn produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub filler: FillerOutcome,
    pub reply: String,
}

/// One conversation: shared history, the filler orchestrator, the main model
/// and the session's metrics pipeline.
pub struct VoiceSession {
    id: String,
    context: SharedContext,
    orchestrator: Arc<TurnOrchestrator>,
    main_llm: Arc<dyn LLMProvider>,
    sink: Arc<dyn SpeechSink>,
    bus: MetricsBus,
    aggregator: SharedAggregator,
    worker: JoinHandle<u64>,
    reporter: UsageSummaryReporter,
}

impl VoiceSession {
    /// Wire up a session. `make_sink` receives the session's metrics bus so
    /// playout can be measured.
    pub fn start(
        state: &AppState,
        main_llm: Arc<dyn LLMProvider>,
        filler_llm: Arc<dyn LLMProvider>,
        make_sink: impl FnOnce(MetricsBus) -> Arc<dyn SpeechSink>,
        filler_config: FillerConfig,
        system_prompt: &str,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let (bus, receiver) = MetricsBus::new();
        let aggregator = MetricsAggregator::new().into_shared();
        let worker = MetricsWorker::new(aggregator.clone())
            .with_exposition(state.exposition.clone())
            .spawn(receiver);

        let sink = make_sink(bus.clone());
        let orchestrator = Arc::new(
            TurnOrchestrator::new(filler_llm, sink.clone(), filler_config).with_metrics(bus.clone()),
        );

        let context =
            ConversationContext::from_messages(vec![Message::system(system_prompt)]).into_shared();
        let reporter = UsageSummaryReporter::start(id.clone(), state.active_conversations.clone());

        log::info!(
            "[{}] Session ready - main model {}, filler context {} items",
            id,
            main_llm.model(),
            orchestrator.config().max_context_items
        );

        Self {
            id,
            context,
            orchestrator,
            main_llm,
            sink,
            bus,
            aggregator,
            worker,
            reporter,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn aggregator(&self) -> &SharedAggregator {
        &self.aggregator
    }

    /// Record the user's line, speak a filler while the main model works,
    /// then speak and record the main reply.
    pub async fn run_turn(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnReport, VoiceError> {
        let user = Message::user(text);
        self.context.write().await.add_message(user.clone());

        let snapshot = self.context.read().await.messages().to_vec();

        let (filler, reply) = tokio::join!(
            self.orchestrator
                .on_turn_completed(&self.context, user.clone(), cancel.child_token()),
            self.generate_reply(&snapshot, &user, &cancel),
        );

        let reply = reply?;
        self.sink
            .say(Box::pin(futures::stream::iter([reply.clone()])), true);
        self.context
            .write()
            .await
            .add_message(Message::assistant(reply.clone()));

        Ok(TurnReport { filler, reply })
    }

    async fn generate_reply(
        &self,
        messages: &[Message],
        user: &Message,
        cancel: &CancellationToken,
    ) -> Result<String, VoiceError> {
        let started = Instant::now();
        let mut stream = self
            .main_llm
            .chat_stream(messages)
            .await
            .map_err(|e| VoiceError::LLM(e.to_string()))?;

        let mut reply = String::new();
        let mut ttft = None;
        let mut total_tokens = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VoiceError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(LLMChunk::Token(token))) => {
                    ttft.get_or_insert_with(|| started.elapsed());
                    reply.push_str(&token);
                }
                Some(Ok(LLMChunk::Usage(usage))) => total_tokens = Some(usage.total_tokens),
                Some(Ok(LLMChunk::Done)) | None => break,
                Some(Err(e)) => return Err(VoiceError::LLM(e.to_string())),
            }
        }

        let mut sample = LlmSample::new("main", started.elapsed().as_secs_f64() * 1000.0)
            .with_conversation(ConversationMarker::new(user.id.clone()));
        sample.meta = EventMeta::with_trace_id(user.id.clone());
        if let Some(ttft) = ttft {
            sample = sample.with_ttft(ttft.as_secs_f64() * 1000.0);
        }
        if let Some(tokens) = total_tokens {
            sample = sample.with_total_tokens(tokens);
        }
        self.bus.emit(sample);

        Ok(reply)
    }

    /// Stop the metrics pipeline, wait for it to drain, then write the
    /// session's usage summary.
    pub async fn shutdown(self) -> Option<UsageRecord> {
        let Self {
            id,
            orchestrator,
            sink,
            bus,
            aggregator,
            worker,
            reporter,
            ..
        } = self;

        // The worker stops once every bus clone is gone.
        drop(orchestrator);
        drop(sink);
        drop(bus);

        if let Err(e) = drain_worker(worker).await {
            log::error!("[{}] {}", id, e);
        }

        let aggregator = aggregator.read().await;
        reporter.report(&aggregator)
    }
}

async fn drain_worker(worker: JoinHandle<u64>) -> Result<u64, MetricsError> {
    match tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(applied)) => Ok(applied),
        Ok(Err(e)) => Err(MetricsError::Worker(e.to_string())),
        Err(_) => Err(MetricsError::Worker(format!(
            "not drained after {:?}",
            WORKER_DRAIN_TIMEOUT
        ))),
    }
}
