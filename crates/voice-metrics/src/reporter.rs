use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use log::{error, info, warn};

use crate::aggregator::MetricsAggregator;
use crate::gauge::ActiveConversations;
use crate::types::{MetricsResult, UsageRecord};

/// Writes the session-end usage record and releases the session's slot in the
/// active-conversation gauge.
pub struct UsageSummaryReporter {
    session_id: String,
    gauge: ActiveConversations,
    reported: AtomicBool,
}

impl UsageSummaryReporter {
    /// Count the session as active. The matching decrement happens in
    /// [`UsageSummaryReporter::report`], or on drop if nothing was reported.
    pub fn start(session_id: impl Into<String>, gauge: ActiveConversations) -> Self {
        let session_id = session_id.into();
        let active = gauge.inc();
        info!("[{}] Session started - {} active conversations", session_id, active);

        Self {
            session_id,
            gauge,
            reported: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Emit one "Session Summary" entry from a snapshot of `aggregator`.
    ///
    /// Only the first call does anything; later calls log and return `None`
    /// so the gauge is never released twice. Formatting failures are logged
    /// and the gauge is still released.
    pub fn report(&self, aggregator: &MetricsAggregator) -> Option<UsageRecord> {
        if self.reported.swap(true, Ordering::SeqCst) {
            warn!("[{}] usage summary already reported, skipping", self.session_id);
            return None;
        }

        let record = UsageRecord::from(&aggregator.get_summary());
        let active_conversations = self.gauge.get();

        match render_record(&record) {
            Ok(usage_summary) => info!(
                "[{}] Session Summary - usage_summary={} active_conversations={} timestamp={}",
                self.session_id,
                usage_summary,
                active_conversations,
                Utc::now().to_rfc3339()
            ),
            Err(e) => error!("[{}] failed to render usage summary: {}", self.session_id, e),
        }

        self.gauge.dec();
        Some(record)
    }
}

impl Drop for UsageSummaryReporter {
    fn drop(&mut self) {
        if !self.reported.swap(true, Ordering::SeqCst) {
            warn!("[{}] Session ended without a usage summary", self.session_id);
            self.gauge.dec();
        }
    }
}

fn render_record(record: &UsageRecord) -> MetricsResult<String> {
    Ok(serde_json::to_string(record)?)
}
