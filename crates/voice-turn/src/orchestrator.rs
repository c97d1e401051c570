use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use voice_core::{Message, SharedContext};
use voice_llm::LLMProvider;
use voice_metrics::{EventMeta, LlmSample, MetricsBus};

use crate::config::FillerConfig;
use crate::context::build_speculative_context;
use crate::filler::{FillerOutcome, FillerTask};
use crate::sink::SpeechSink;
use crate::stream::{forward_and_accumulate, StreamProbe};

/// Speaks a short filler from a fast model while the main reply is still
/// being generated, then records what was said in the conversation.
///
/// Turns are handled one at a time: a filler is appended to the shared
/// context before the next turn builds its speculative context.
pub struct TurnOrchestrator {
    llm: Arc<dyn LLMProvider>,
    sink: Arc<dyn SpeechSink>,
    config: FillerConfig,
    metrics: Option<MetricsBus>,
    turn_lock: Mutex<()>,
}

impl TurnOrchestrator {
    pub fn new(llm: Arc<dyn LLMProvider>, sink: Arc<dyn SpeechSink>, config: FillerConfig) -> Self {
        Self {
            llm,
            sink,
            config,
            metrics: None,
            turn_lock: Mutex::new(()),
        }
    }

    pub fn with_metrics(mut self, bus: MetricsBus) -> Self {
        self.metrics = Some(bus);
        self
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Handle the end of a user turn.
    ///
    /// `new_message` is appended to `context` once this turn holds the turn
    /// lock, unless the host already appended it. The fast model runs on a
    /// trimmed copy of `context`, its text goes to the sink as it streams,
    /// and once the generation completes it is appended as an assistant
    /// message. Failed or cancelled generations append nothing further.
    ///
    /// A host that has not appended `new_message` itself therefore sees two
    /// appends from one call: the user message, then the filler.
    pub async fn on_turn_completed(
        &self,
        context: &SharedContext,
        new_message: Message,
        cancel: CancellationToken,
    ) -> FillerOutcome {
        let _turn = self.turn_lock.lock().await;

        let speculative = {
            let mut history = context.write().await;
            if history.position(&new_message.id).is_none() {
                history.add_message(new_message.clone());
            }
            build_speculative_context(&history, &new_message, &self.config)
        };
        log::debug!(
            "filler context for turn {}: {} messages",
            new_message.id,
            speculative.len()
        );

        let task = FillerTask::new();
        let mut waiter = task.subscribe();
        let turn_cancel = cancel.child_token();
        let started = Instant::now();

        let upstream = tokio::select! {
            biased;
            _ = turn_cancel.cancelled() => {
                log::info!("turn {} cancelled before the filler started", new_message.id);
                task.cancel(String::new());
                return self.outcome_of(&task);
            }
            opened = self.llm.chat_stream(&speculative) => opened,
        };

        let upstream = match upstream {
            Ok(stream) => stream,
            Err(error) => {
                log::warn!("filler request failed for turn {}: {}", new_message.id, error);
                task.fail(String::new(), error.to_string());
                return self.outcome_of(&task);
            }
        };

        let probe = Arc::new(StreamProbe::new(started));
        let speech = forward_and_accumulate(upstream, task.clone(), turn_cancel.clone(), probe.clone());
        self.sink.say(speech, false);

        let outcome = tokio::select! {
            outcome = waiter.wait() => outcome,
            _ = turn_cancel.cancelled() => self.abandon(&task, &turn_cancel, &probe),
            _ = Self::deadline(self.config.filler_timeout) => {
                log::warn!(
                    "filler for turn {} timed out after {:?}",
                    new_message.id,
                    self.config.filler_timeout
                );
                self.abandon(&task, &turn_cancel, &probe)
            }
        };

        self.record_sample(&new_message, started, &probe, &outcome);
        self.commit(context, &outcome).await;
        outcome
    }

    /// Run [`Self::on_turn_completed`] in the background.
    pub fn spawn_turn(
        self: Arc<Self>,
        context: SharedContext,
        new_message: Message,
        cancel: CancellationToken,
    ) -> TurnHandle {
        let turn_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            self.on_turn_completed(&context, new_message, turn_cancel)
                .await
        });
        TurnHandle { cancel, join }
    }

    async fn deadline(timeout: Option<std::time::Duration>) {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    }

    // Stop the stream and settle the task with what was already spoken, even
    // if the sink never polls the stream again.
    fn abandon(
        &self,
        task: &FillerTask,
        turn_cancel: &CancellationToken,
        probe: &StreamProbe,
    ) -> FillerOutcome {
        turn_cancel.cancel();
        task.cancel(probe.forwarded_text());
        self.outcome_of(task)
    }

    fn outcome_of(&self, task: &FillerTask) -> FillerOutcome {
        task.outcome().unwrap_or(FillerOutcome::Cancelled {
            partial: String::new(),
        })
    }

    fn record_sample(
        &self,
        new_message: &Message,
        started: Instant,
        probe: &StreamProbe,
        outcome: &FillerOutcome,
    ) {
        let Some(bus) = &self.metrics else {
            return;
        };

        let mut sample = LlmSample::new(
            self.config.metrics_label.clone(),
            started.elapsed().as_secs_f64() * 1000.0,
        )
        .with_cancelled(matches!(outcome, FillerOutcome::Cancelled { .. }));
        sample.meta = EventMeta::with_trace_id(new_message.id.clone());
        if let Some(ttft) = probe.time_to_first_chunk() {
            sample = sample.with_ttft(ttft.as_secs_f64() * 1000.0);
        }
        if let Some(usage) = probe.usage() {
            sample = sample.with_total_tokens(usage.total_tokens);
        }
        bus.emit(sample);
    }

    async fn commit(&self, context: &SharedContext, outcome: &FillerOutcome) {
        match outcome {
            FillerOutcome::Resolved(text) => {
                if text.is_empty() && !self.config.append_empty_filler {
                    log::debug!("Fast response was empty, not recorded");
                    return;
                }
                log::info!("Fast response: {}", text);
                context
                    .write()
                    .await
                    .add_message(Message::assistant(text.clone()).with_interrupted(false));
            }
            FillerOutcome::Failed { partial, error } => {
                log::warn!("Fast response failed after {:?}: {}", partial, error);
            }
            FillerOutcome::Cancelled { partial } => {
                log::info!("Fast response cancelled after {:?}", partial);
            }
        }
    }
}

/// A turn running in the background.
pub struct TurnHandle {
    cancel: CancellationToken,
    join: JoinHandle<FillerOutcome>,
}

impl TurnHandle {
    /// Interrupt the turn, e.g. when the user starts speaking again.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> FillerOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(error) => {
                log::error!("filler turn task failed: {}", error);
                FillerOutcome::Cancelled {
                    partial: String::new(),
                }
            }
        }
    }
}
