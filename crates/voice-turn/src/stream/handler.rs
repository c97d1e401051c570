use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use voice_llm::{LLMChunk, LLMStream, TokenUsage};

use crate::filler::FillerTask;
use crate::sink::SpeechStream;

/// What the forwarding stream observed, read by the orchestrator afterwards.
#[derive(Debug)]
pub struct StreamProbe {
    started: Instant,
    first_chunk: OnceLock<Duration>,
    usage: OnceLock<TokenUsage>,
    chunks: AtomicUsize,
    forwarded: Mutex<String>,
}

impl StreamProbe {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            first_chunk: OnceLock::new(),
            usage: OnceLock::new(),
            chunks: AtomicUsize::new(0),
            forwarded: Mutex::new(String::new()),
        }
    }

    fn record_chunk(&self, chunk: &str) {
        let _ = self.first_chunk.set(self.started.elapsed());
        self.chunks.fetch_add(1, Ordering::Relaxed);
        match self.forwarded.lock() {
            Ok(mut forwarded) => forwarded.push_str(chunk),
            Err(poisoned) => poisoned.into_inner().push_str(chunk),
        }
    }

    fn record_usage(&self, usage: TokenUsage) {
        let _ = self.usage.set(usage);
    }

    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        self.first_chunk.get().copied()
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage.get().copied()
    }

    pub fn chunks(&self) -> usize {
        self.chunks.load(Ordering::Relaxed)
    }

    /// Everything handed on to the sink so far.
    pub fn forwarded_text(&self) -> String {
        match self.forwarded.lock() {
            Ok(forwarded) => forwarded.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Accumulated text plus the task it resolves. Dropping it before a terminal
/// state was written cancels the task with whatever text arrived so far.
struct Accumulation {
    task: FillerTask,
    text: String,
}

impl Accumulation {
    fn new(task: FillerTask) -> Self {
        task.mark_streaming();
        Self {
            task,
            text: String::new(),
        }
    }

    fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    fn resolve(&mut self) {
        self.task.resolve(std::mem::take(&mut self.text));
    }

    fn fail(&mut self, error: String) {
        self.task.fail(std::mem::take(&mut self.text), error);
    }

    fn cancel(&mut self) {
        self.task.cancel(std::mem::take(&mut self.text));
    }
}

impl Drop for Accumulation {
    fn drop(&mut self) {
        if !self.task.state().is_terminal() {
            log::info!("filler stream dropped after {} chars", self.text.len());
            self.cancel();
        }
    }
}

/// Wrap the fast model's stream so that every text chunk is handed on
/// unaltered as soon as it arrives while also being accumulated into `task`.
///
/// `task` reaches a terminal state when the upstream ends (`Resolved`), fails
/// (`Failed`), `cancel` fires (`Cancelled`, upstream dropped) or the returned
/// stream is dropped early (`Cancelled`).
pub fn forward_and_accumulate(
    mut upstream: LLMStream,
    task: FillerTask,
    cancel: CancellationToken,
    probe: std::sync::Arc<StreamProbe>,
) -> SpeechStream {
    // Built outside the generator so that dropping a stream that was never
    // polled still cancels the task.
    let mut accumulation = Accumulation::new(task);

    let stream = async_stream::stream! {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("filler stream cancelled after {} chunks", probe.chunks());
                    accumulation.cancel();
                    break;
                }
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(LLMChunk::Token(token))) => {
                    if token.is_empty() {
                        continue;
                    }
                    probe.record_chunk(&token);
                    accumulation.push(&token);
                    yield token;
                }
                Some(Ok(LLMChunk::Usage(usage))) => probe.record_usage(usage),
                Some(Ok(LLMChunk::Done)) | None => {
                    accumulation.resolve();
                    break;
                }
                Some(Err(error)) => {
                    log::warn!("filler stream failed after {} chunks: {}", probe.chunks(), error);
                    accumulation.fail(error.to_string());
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::stream;
    use voice_llm::LLMError;

    use super::*;
    use crate::filler::{FillerOutcome, FillerState};

    fn build_stream(items: Vec<voice_llm::provider::Result<LLMChunk>>) -> LLMStream {
        Box::pin(stream::iter(items))
    }

    fn probe() -> Arc<StreamProbe> {
        Arc::new(StreamProbe::new(Instant::now()))
    }

    #[tokio::test]
    async fn forwards_chunks_and_resolves_with_their_concatenation() {
        let upstream = build_stream(vec![
            Ok(LLMChunk::Token("Hm, ".to_string())),
            Ok(LLMChunk::Token(String::new())),
            Ok(LLMChunk::Token("let me ".to_string())),
            Ok(LLMChunk::Token("think.".to_string())),
            Ok(LLMChunk::Usage(TokenUsage {
                prompt_tokens: 40,
                completion_tokens: 6,
                total_tokens: 46,
            })),
            Ok(LLMChunk::Done),
        ]);
        let task = FillerTask::new();
        let probe = probe();

        let forwarded: Vec<String> =
            forward_and_accumulate(upstream, task.clone(), CancellationToken::new(), probe.clone())
                .collect()
                .await;

        assert_eq!(forwarded, vec!["Hm, ", "let me ", "think."]);
        assert_eq!(
            task.outcome(),
            Some(FillerOutcome::Resolved(forwarded.concat()))
        );
        assert_eq!(probe.chunks(), 3);
        assert_eq!(probe.forwarded_text(), "Hm, let me think.");
        assert_eq!(probe.usage().map(|u| u.total_tokens), Some(46));
        assert!(probe.time_to_first_chunk().is_some());
    }

    #[tokio::test]
    async fn upstream_error_fails_with_partial_text() {
        let upstream = build_stream(vec![
            Ok(LLMChunk::Token("Wait ".to_string())),
            Err(LLMError::Stream("connection reset".to_string())),
            Ok(LLMChunk::Token("never".to_string())),
        ]);
        let task = FillerTask::new();

        let forwarded: Vec<String> =
            forward_and_accumulate(upstream, task.clone(), CancellationToken::new(), probe())
                .collect()
                .await;

        assert_eq!(forwarded, vec!["Wait "]);
        match task.state() {
            FillerState::Failed { partial, error } => {
                assert_eq!(partial, "Wait ");
                assert!(error.contains("connection reset"));
            }
            other => panic!("expected failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_the_stream_early_cancels_with_partial_text() {
        let upstream = build_stream(vec![
            Ok(LLMChunk::Token("One ".to_string())),
            Ok(LLMChunk::Token("moment ".to_string())),
            Ok(LLMChunk::Token("please.".to_string())),
        ]);
        let task = FillerTask::new();

        let mut forwarded =
            forward_and_accumulate(upstream, task.clone(), CancellationToken::new(), probe());
        assert_eq!(forwarded.next().await.as_deref(), Some("One "));
        assert_eq!(task.state(), FillerState::Streaming);
        drop(forwarded);

        assert_eq!(
            task.outcome(),
            Some(FillerOutcome::Cancelled {
                partial: "One ".to_string()
            })
        );
    }

    #[tokio::test]
    async fn cancel_token_stops_a_stalled_upstream() {
        let upstream: LLMStream = Box::pin(
            stream::iter(vec![Ok(LLMChunk::Token("Sure, ".to_string()))])
                .chain(stream::pending()),
        );
        let task = FillerTask::new();
        let cancel = CancellationToken::new();

        let mut forwarded = forward_and_accumulate(upstream, task.clone(), cancel.clone(), probe());
        assert_eq!(forwarded.next().await.as_deref(), Some("Sure, "));

        cancel.cancel();
        assert!(forwarded.next().await.is_none());
        assert_eq!(
            task.outcome(),
            Some(FillerOutcome::Cancelled {
                partial: "Sure, ".to_string()
            })
        );
    }

    #[tokio::test]
    async fn never_polled_stream_cancels_on_drop() {
        let task = FillerTask::new();
        let forwarded = forward_and_accumulate(
            build_stream(vec![Ok(LLMChunk::Token("x".to_string()))]),
            task.clone(),
            CancellationToken::new(),
            probe(),
        );
        assert_eq!(task.state(), FillerState::Streaming);
        drop(forwarded);

        assert_eq!(
            task.outcome(),
            Some(FillerOutcome::Cancelled {
                partial: String::new()
            })
        );
    }
}
