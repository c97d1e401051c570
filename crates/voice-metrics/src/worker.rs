use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::aggregator::SharedAggregator;
use crate::events::{MetricsEvent, SampleKind};

/// Single writer that drains the bus into the aggregators, one event at a time
/// in receive order.
pub struct MetricsWorker {
    session: SharedAggregator,
    exposition: Option<SharedAggregator>,
}

impl MetricsWorker {
    pub fn new(session: SharedAggregator) -> Self {
        Self {
            session,
            exposition: None,
        }
    }

    /// Also fold every event into a process-wide aggregator (the scrape view).
    pub fn with_exposition(mut self, exposition: SharedAggregator) -> Self {
        self.exposition = Some(exposition);
        self
    }

    /// Spawn the worker task
    ///
    /// The task ends once every [`crate::MetricsBus`] clone has been dropped
    /// and the backlog is drained; it yields the number of events applied.
    pub fn spawn(self, mut receiver: mpsc::UnboundedReceiver<MetricsEvent>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            info!("MetricsWorker started");
            let mut applied = 0u64;

            while let Some(event) = receiver.recv().await {
                self.session.write().await.handle_event(&event);
                if let Some(exposition) = self.exposition.as_ref() {
                    exposition.write().await.apply(&event);
                }
                applied += 1;
                debug!(
                    "MetricsWorker applied {} event #{}",
                    event_label(&event),
                    applied
                );
            }

            info!("MetricsWorker stopped after {} events", applied);
            applied
        })
    }
}

fn event_label(event: &MetricsEvent) -> &'static str {
    match event {
        MetricsEvent::ConversationTurn(_) => "conversation",
        MetricsEvent::Unrecognized => "unrecognized",
        _ => event.kind().map_or("sample", SampleKind::as_str),
    }
}
