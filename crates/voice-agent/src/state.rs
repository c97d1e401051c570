use voice_metrics::{ActiveConversations, MetricsAggregator, SharedAggregator};

/// Process-wide metrics shared by every session and the scrape server.
#[derive(Clone, Default)]
pub struct AppState {
    /// Folded from every session's samples; never reset.
    pub exposition: SharedAggregator,
    pub active_conversations: ActiveConversations,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            exposition: MetricsAggregator::new().into_shared(),
            active_conversations: ActiveConversations::new(),
        }
    }
}
