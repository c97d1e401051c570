use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::StreamExt;
use voice_metrics::{MetricsBus, TtsSample};
use voice_turn::{SpeechSink, SpeechStream};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Stands in for text-to-speech: writes each fragment as it arrives and
/// reports the playout as a TTS sample.
pub struct ConsoleSpeechSink {
    out: SharedWriter,
    metrics: Option<MetricsBus>,
    label: String,
}

impl ConsoleSpeechSink {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            metrics: None,
            label: "console".to_string(),
        }
    }

    pub fn with_metrics(mut self, bus: MetricsBus) -> Self {
        self.metrics = Some(bus);
        self
    }
}

impl SpeechSink for ConsoleSpeechSink {
    fn say(&self, mut text: SpeechStream, add_to_history: bool) {
        let out = Arc::clone(&self.out);
        let metrics = self.metrics.clone();
        let label = self.label.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let mut first_fragment = None;
            let mut characters = 0u64;

            while let Some(fragment) = text.next().await {
                first_fragment.get_or_insert_with(|| started.elapsed());
                characters += fragment.chars().count() as u64;
                write_fragment(&out, &fragment);
            }
            write_fragment(&out, "\n");

            log::debug!(
                "playout finished: {} chars, add_to_history={}",
                characters,
                add_to_history
            );

            if let Some(bus) = metrics {
                let mut sample = TtsSample::new(label, started.elapsed().as_secs_f64() * 1000.0)
                    .with_characters(characters);
                if let Some(ttfb) = first_fragment {
                    sample = sample.with_ttfb(ttfb.as_secs_f64() * 1000.0);
                }
                bus.emit(sample);
            }
        });
    }
}

fn write_fragment(out: &SharedWriter, fragment: &str) {
    let mut out = match out.lock() {
        Ok(out) => out,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = out.write_all(fragment.as_bytes()).and_then(|_| out.flush()) {
        log::warn!("failed to write speech fragment: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::stream;
    use voice_metrics::MetricsEvent;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_fragments_and_reports_playout() {
        let capture = Capture::default();
        let (bus, mut rx) = MetricsBus::new();
        let sink = ConsoleSpeechSink::with_writer(Box::new(capture.clone())).with_metrics(bus);

        let fragments = vec!["Hm, ".to_string(), "let me think.".to_string()];
        sink.say(Box::pin(stream::iter(fragments)), false);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("playout sample")
            .expect("bus open");

        match event {
            MetricsEvent::Tts(sample) => {
                assert_eq!(sample.label, "console");
                assert_eq!(sample.characters_count, 17);
                assert!(sample.ttfb_ms.is_some());
            }
            other => panic!("expected tts sample, got {other:?}"),
        }

        let written = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "Hm, let me think.\n");
    }
}
