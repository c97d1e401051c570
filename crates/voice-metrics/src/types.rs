use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metrics worker stopped: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LlmUsage {
    pub requests: u64,
    pub duration_ms: f64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeechUsage {
    pub requests: u64,
    pub duration_ms: f64,
}

/// Point-in-time view of one aggregator.
///
/// `llm`, `stt` and `tts` are `None` when that stage never produced a sample,
/// which is different from a stage that ran and measured zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageSummary {
    pub llm: Option<LlmUsage>,
    pub stt: Option<SpeechUsage>,
    pub tts: Option<SpeechUsage>,
    pub vad_samples: u64,
    pub conversation_turns: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LlmUsageRecord {
    pub total_tokens: u64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeechUsageRecord {
    pub duration_ms: f64,
}

/// The session-end usage record, as written to the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmUsageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt: Option<SpeechUsageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<SpeechUsageRecord>,
}

impl From<&UsageSummary> for UsageRecord {
    fn from(summary: &UsageSummary) -> Self {
        Self {
            llm: summary.llm.map(|llm| LlmUsageRecord {
                total_tokens: llm.total_tokens,
                duration_ms: llm.duration_ms,
            }),
            stt: summary.stt.map(|stt| SpeechUsageRecord {
                duration_ms: stt.duration_ms,
            }),
            tts: summary.tts.map(|tts| SpeechUsageRecord {
                duration_ms: tts.duration_ms,
            }),
        }
    }
}
