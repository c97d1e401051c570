pub mod aggregator;
pub mod bus;
pub mod events;
pub mod exposition;
pub mod gauge;
pub mod reporter;
pub mod types;
pub mod worker;

pub use aggregator::{Distribution, MetricsAggregator, SharedAggregator};
pub use bus::MetricsBus;
pub use events::{
    ConversationMarker, EventMeta, LlmSample, MetricsEvent, SampleKind, SttSample, TtsSample,
    VadSample,
};
pub use exposition::render_prometheus;
pub use gauge::ActiveConversations;
pub use reporter::UsageSummaryReporter;
pub use types::{
    LlmUsage, LlmUsageRecord, MetricsError, MetricsResult, SpeechUsage, SpeechUsageRecord,
    UsageRecord, UsageSummary,
};
pub use worker::MetricsWorker;
