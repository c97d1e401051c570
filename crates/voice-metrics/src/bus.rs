use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::MetricsEvent;

/// Channel-based metrics event bus
///
/// Emission never blocks the caller. The channel is unbounded so a slow
/// worker delays samples but never loses them; events are only dropped (and
/// counted) once the receiving worker is gone.
pub struct MetricsBus {
    tx: mpsc::UnboundedSender<MetricsEvent>,
    dropped: Arc<AtomicU64>,
}

impl MetricsBus {
    /// Returns the bus (for emitting events) and the receiver (for the worker)
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MetricsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn emit(&self, event: impl Into<MetricsEvent>) {
        if self.tx.send(event.into()).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!("metrics worker is gone, dropped {} events so far", dropped);
        }
    }

    /// Get the number of dropped events since the bus was created
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Check if the channel is closed (receiver dropped)
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Clone for MetricsBus {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LlmSample, SttSample};
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_bus_delivers_in_emission_order() {
        let (bus, mut rx) = MetricsBus::new();

        bus.emit(LlmSample::new("main", 1.0));
        bus.emit(SttSample::new("deepgram", 2.0));

        let first = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Should receive event")
            .expect("Event should exist");
        let second = rx.recv().await.expect("second event");

        assert!(matches!(first, MetricsEvent::Llm(_)));
        assert!(matches!(second, MetricsEvent::Stt(_)));
    }

    #[test]
    fn test_bus_counts_drops_after_receiver_closed() {
        let (bus, rx) = MetricsBus::new();
        drop(rx);

        assert!(bus.is_closed());
        bus.emit(LlmSample::new("main", 1.0));
        assert_eq!(bus.dropped_count(), 1);
    }

    #[test]
    fn test_bus_clone_shares_dropped_counter() {
        let (bus1, rx) = MetricsBus::new();
        let bus2 = bus1.clone();
        drop(rx);

        bus1.emit(LlmSample::new("main", 1.0));
        assert_eq!(bus2.dropped_count(), 1);
    }
}
