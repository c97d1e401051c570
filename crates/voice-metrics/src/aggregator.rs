use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::events::MetricsEvent;
use crate::types::{LlmUsage, SpeechUsage, UsageSummary};

pub type SharedAggregator = Arc<RwLock<MetricsAggregator>>;

/// Running count/sum pair for one measured duration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Distribution {
    pub count: u64,
    pub sum: f64,
}

impl Distribution {
    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Per-session accumulation of pipeline samples.
///
/// Samples are applied in the order they are handed in and never revised.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    llm_latency: Distribution,
    stt_latency: Distribution,
    tts_latency: Distribution,
    total_tokens: u64,
    vad_samples: u64,
    conversation_turns: u64,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedAggregator {
        Arc::new(RwLock::new(self))
    }

    /// Log the sample, then fold it into the running state.
    pub fn handle_event(&mut self, event: &MetricsEvent) {
        match event {
            MetricsEvent::Llm(sample) => info!(
                "LLM: {} - {:.1}ms - {} tokens (at {})",
                sample.label,
                sample.duration_ms,
                sample.total_tokens.unwrap_or(0),
                sample.meta.occurred_at.to_rfc3339()
            ),
            MetricsEvent::Stt(sample) => info!(
                "STT: {} - {:.1}ms (at {})",
                sample.label,
                sample.duration_ms,
                sample.meta.occurred_at.to_rfc3339()
            ),
            MetricsEvent::Tts(sample) => info!(
                "TTS: {} - {:.1}ms (at {})",
                sample.label,
                sample.duration_ms,
                sample.meta.occurred_at.to_rfc3339()
            ),
            MetricsEvent::Vad(sample) => debug!("VAD: {:?}", sample),
            MetricsEvent::ConversationTurn(_) => {}
            MetricsEvent::Unrecognized => {
                warn!("Metrics: ignoring sample of unrecognized kind");
            }
        }

        self.apply(event);

        if let Some(marker) = event.conversation() {
            info!(
                "Conversation: turn {} closed - {} turns so far",
                marker.turn_id, self.conversation_turns
            );
        }
    }

    /// Fold a sample into the running state without logging it.
    pub fn apply(&mut self, event: &MetricsEvent) {
        match event {
            MetricsEvent::Llm(sample) => {
                self.llm_latency.observe(sample.duration_ms);
                if let Some(tokens) = sample.total_tokens {
                    self.total_tokens += tokens;
                }
            }
            MetricsEvent::Stt(sample) => self.stt_latency.observe(sample.duration_ms),
            MetricsEvent::Tts(sample) => self.tts_latency.observe(sample.duration_ms),
            MetricsEvent::Vad(_) => self.vad_samples += 1,
            MetricsEvent::ConversationTurn(_) | MetricsEvent::Unrecognized => {}
        }

        if event.conversation().is_some() {
            self.conversation_turns += 1;
        }
    }

    pub fn llm_latency(&self) -> Distribution {
        self.llm_latency
    }

    pub fn stt_latency(&self) -> Distribution {
        self.stt_latency
    }

    pub fn tts_latency(&self) -> Distribution {
        self.tts_latency
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn conversation_turns(&self) -> u64 {
        self.conversation_turns
    }

    pub fn get_summary(&self) -> UsageSummary {
        UsageSummary {
            llm: (!self.llm_latency.is_empty()).then_some(LlmUsage {
                requests: self.llm_latency.count,
                duration_ms: self.llm_latency.sum,
                total_tokens: self.total_tokens,
            }),
            stt: speech_usage(self.stt_latency),
            tts: speech_usage(self.tts_latency),
            vad_samples: self.vad_samples,
            conversation_turns: self.conversation_turns,
        }
    }
}

fn speech_usage(distribution: Distribution) -> Option<SpeechUsage> {
    (!distribution.is_empty()).then_some(SpeechUsage {
        requests: distribution.count,
        duration_ms: distribution.sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ConversationMarker, LlmSample, SttSample, TtsSample, VadSample};

    #[test]
    fn llm_samples_accumulate_latency_and_tokens() {
        let mut aggregator = MetricsAggregator::new();

        for duration in [100.0, 150.0, 120.0, 90.0, 200.0] {
            aggregator.handle_event(&LlmSample::new("main", duration).into());
        }
        aggregator.handle_event(&LlmSample::new("main", 0.0).with_total_tokens(10).into());
        aggregator.handle_event(&LlmSample::new("main", 0.0).with_total_tokens(20).into());

        let latency = aggregator.llm_latency();
        assert_eq!(latency.count, 7);
        assert_eq!(latency.sum, 660.0);
        assert_eq!(aggregator.total_tokens(), 30);
    }

    #[test]
    fn five_llm_samples_give_count_five_sum_660() {
        let mut aggregator = MetricsAggregator::new();
        for duration in [100.0, 150.0, 120.0, 90.0, 200.0] {
            aggregator.handle_event(&LlmSample::new("main", duration).into());
        }

        assert_eq!(
            aggregator.llm_latency(),
            Distribution {
                count: 5,
                sum: 660.0
            }
        );
        assert_eq!(aggregator.llm_latency().average(), Some(132.0));
    }

    #[test]
    fn stt_and_tts_only_touch_their_own_distribution() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(&SttSample::new("deepgram", 80.0).into());
        aggregator.handle_event(&TtsSample::new("openai", 240.0).into());
        aggregator.handle_event(&TtsSample::new("openai", 60.0).into());

        assert!(aggregator.llm_latency().is_empty());
        assert_eq!(aggregator.stt_latency().count, 1);
        assert_eq!(aggregator.stt_latency().sum, 80.0);
        assert_eq!(aggregator.tts_latency().count, 2);
        assert_eq!(aggregator.tts_latency().sum, 300.0);
        assert_eq!(aggregator.total_tokens(), 0);
    }

    #[test]
    fn vad_samples_never_change_latency_distributions() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(&LlmSample::new("main", 100.0).into());
        let before = aggregator.get_summary();

        aggregator.handle_event(&VadSample::new("silero", 35.0, 12).into());

        let after = aggregator.get_summary();
        assert_eq!(before.llm, after.llm);
        assert_eq!(before.stt, after.stt);
        assert_eq!(before.tts, after.tts);
        assert_eq!(after.vad_samples, 1);
    }

    #[test]
    fn conversation_marker_counts_turns_for_any_kind() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(
            &VadSample {
                conversation: Some(ConversationMarker::new("t-1")),
                ..VadSample::new("silero", 1.0, 1)
            }
            .into(),
        );
        aggregator.handle_event(
            &LlmSample::new("main", 10.0)
                .with_conversation(ConversationMarker::new("t-2"))
                .into(),
        );
        aggregator.handle_event(&MetricsEvent::ConversationTurn(ConversationMarker::new("t-3")));
        aggregator.handle_event(&LlmSample::new("main", 10.0).into());

        assert_eq!(aggregator.conversation_turns(), 3);
    }

    #[test]
    fn unrecognized_events_are_ignored() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(&MetricsEvent::Unrecognized);
        assert_eq!(aggregator.get_summary(), UsageSummary::default());
    }

    #[test]
    fn summary_is_idempotent_between_updates() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(&LlmSample::new("main", 42.0).with_total_tokens(7).into());

        let first = aggregator.get_summary();
        let second = aggregator.get_summary();
        assert_eq!(first, second);

        aggregator.handle_event(&LlmSample::new("main", 1.0).into());
        assert_ne!(aggregator.get_summary(), first);
    }

    #[test]
    fn summary_omits_stages_never_observed() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.handle_event(&LlmSample::new("main", 42.0).into());
        aggregator.handle_event(&TtsSample::new("openai", 12.0).into());

        let summary = aggregator.get_summary();
        assert!(summary.llm.is_some());
        assert!(summary.tts.is_some());
        assert!(summary.stt.is_none());
    }
}
