use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every metrics event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMeta {
    /// Unique event ID (UUID v4)
    pub event_id: String,
    /// When the measurement was taken
    pub occurred_at: DateTime<Utc>,
    /// Optional trace ID for correlating one turn across stages
    pub trace_id: Option<String>,
}

impl EventMeta {
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            trace_id: None,
        }
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: Some(trace_id.into()),
            ..Self::new()
        }
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a sample as closing one conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMarker {
    pub turn_id: String,
}

impl ConversationMarker {
    pub fn new(turn_id: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Llm,
    Stt,
    Tts,
    Vad,
}

impl SampleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Stt => "stt",
            Self::Tts => "tts",
            Self::Vad => "vad",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSample {
    pub meta: EventMeta,
    /// Which model call produced this, e.g. "filler" or "main".
    pub label: String,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttft_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationMarker>,
}

impl LlmSample {
    pub fn new(label: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            meta: EventMeta::new(),
            label: label.into(),
            duration_ms,
            ttft_ms: None,
            total_tokens: None,
            cancelled: false,
            conversation: None,
        }
    }

    pub fn with_ttft(mut self, ttft_ms: f64) -> Self {
        self.ttft_ms = Some(ttft_ms);
        self
    }

    pub fn with_total_tokens(mut self, total_tokens: u64) -> Self {
        self.total_tokens = Some(total_tokens);
        self
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_conversation(mut self, marker: ConversationMarker) -> Self {
        self.conversation = Some(marker);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SttSample {
    pub meta: EventMeta,
    pub label: String,
    pub duration_ms: f64,
    #[serde(default)]
    pub audio_duration_ms: f64,
    #[serde(default)]
    pub streamed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationMarker>,
}

impl SttSample {
    pub fn new(label: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            meta: EventMeta::new(),
            label: label.into(),
            duration_ms,
            audio_duration_ms: 0.0,
            streamed: false,
            conversation: None,
        }
    }

    pub fn with_conversation(mut self, marker: ConversationMarker) -> Self {
        self.conversation = Some(marker);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsSample {
    pub meta: EventMeta,
    pub label: String,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<f64>,
    #[serde(default)]
    pub characters_count: u64,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationMarker>,
}

impl TtsSample {
    pub fn new(label: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            meta: EventMeta::new(),
            label: label.into(),
            duration_ms,
            ttfb_ms: None,
            characters_count: 0,
            cancelled: false,
            conversation: None,
        }
    }

    pub fn with_ttfb(mut self, ttfb_ms: f64) -> Self {
        self.ttfb_ms = Some(ttfb_ms);
        self
    }

    pub fn with_characters(mut self, characters_count: u64) -> Self {
        self.characters_count = characters_count;
        self
    }

    pub fn with_cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VadSample {
    pub meta: EventMeta,
    pub label: String,
    pub idle_time_ms: f64,
    pub inference_duration_ms: f64,
    pub inference_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationMarker>,
}

impl VadSample {
    pub fn new(label: impl Into<String>, inference_duration_ms: f64, inference_count: u64) -> Self {
        Self {
            meta: EventMeta::new(),
            label: label.into(),
            idle_time_ms: 0.0,
            inference_duration_ms,
            inference_count,
            conversation: None,
        }
    }
}

/// Closed set of events the aggregator understands.
///
/// Deserializing an unknown `kind` yields [`MetricsEvent::Unrecognized`]
/// instead of failing, so a newer producer cannot break an older consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricsEvent {
    Llm(LlmSample),
    Stt(SttSample),
    Tts(TtsSample),
    Vad(VadSample),
    ConversationTurn(ConversationMarker),
    #[serde(other)]
    Unrecognized,
}

impl MetricsEvent {
    pub fn kind(&self) -> Option<SampleKind> {
        match self {
            Self::Llm(_) => Some(SampleKind::Llm),
            Self::Stt(_) => Some(SampleKind::Stt),
            Self::Tts(_) => Some(SampleKind::Tts),
            Self::Vad(_) => Some(SampleKind::Vad),
            Self::ConversationTurn(_) | Self::Unrecognized => None,
        }
    }

    pub fn conversation(&self) -> Option<&ConversationMarker> {
        match self {
            Self::Llm(sample) => sample.conversation.as_ref(),
            Self::Stt(sample) => sample.conversation.as_ref(),
            Self::Tts(sample) => sample.conversation.as_ref(),
            Self::Vad(sample) => sample.conversation.as_ref(),
            Self::ConversationTurn(marker) => Some(marker),
            Self::Unrecognized => None,
        }
    }
}

impl From<LlmSample> for MetricsEvent {
    fn from(sample: LlmSample) -> Self {
        Self::Llm(sample)
    }
}

impl From<SttSample> for MetricsEvent {
    fn from(sample: SttSample) -> Self {
        Self::Stt(sample)
    }
}

impl From<TtsSample> for MetricsEvent {
    fn from(sample: TtsSample) -> Self {
        Self::Tts(sample)
    }
}

impl From<VadSample> for MetricsEvent {
    fn from(sample: VadSample) -> Self {
        Self::Vad(sample)
    }
}
