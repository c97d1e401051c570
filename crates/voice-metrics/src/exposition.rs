//! Prometheus text exposition of an aggregate snapshot.

use std::fmt::Write;

use crate::types::UsageSummary;

const PREFIX: &str = "voice";

/// Render `summary` plus the live gauge value in the text exposition format.
///
/// Latencies are exposed as summaries without quantiles (`_count`/`_sum`),
/// which is what the scrape side needs to derive averages and rates.
pub fn render_prometheus(summary: &UsageSummary, active_conversations: i64) -> String {
    let mut out = String::new();

    let (llm_count, llm_sum, tokens) = summary
        .llm
        .map(|llm| (llm.requests, llm.duration_ms, llm.total_tokens))
        .unwrap_or_default();
    let (stt_count, stt_sum) = summary
        .stt
        .map(|stt| (stt.requests, stt.duration_ms))
        .unwrap_or_default();
    let (tts_count, tts_sum) = summary
        .tts
        .map(|tts| (tts.requests, tts.duration_ms))
        .unwrap_or_default();

    write_summary(&mut out, "llm_duration_ms", "LLM latency in milliseconds", llm_count, llm_sum);
    write_summary(&mut out, "stt_duration_ms", "Speech-to-text latency in milliseconds", stt_count, stt_sum);
    write_summary(&mut out, "tts_duration_ms", "Text-to-speech latency in milliseconds", tts_count, tts_sum);
    write_metric(&mut out, "total_tokens_total", "counter", "Total tokens processed", tokens as f64);
    write_metric(
        &mut out,
        "conversation_turns_total",
        "counter",
        "Number of conversation turns",
        summary.conversation_turns as f64,
    );
    write_metric(
        &mut out,
        "active_conversations",
        "gauge",
        "Number of active conversations",
        active_conversations as f64,
    );

    out
}

fn write_summary(out: &mut String, name: &str, help: &str, count: u64, sum: f64) {
    let _ = writeln!(out, "# HELP {PREFIX}_{name} {help}");
    let _ = writeln!(out, "# TYPE {PREFIX}_{name} summary");
    let _ = writeln!(out, "{PREFIX}_{name}_count {count}");
    let _ = writeln!(out, "{PREFIX}_{name}_sum {sum}");
}

fn write_metric(out: &mut String, name: &str, kind: &str, help: &str, value: f64) {
    let _ = writeln!(out, "# HELP {PREFIX}_{name} {help}");
    let _ = writeln!(out, "# TYPE {PREFIX}_{name} {kind}");
    let _ = writeln!(out, "{PREFIX}_{name} {value}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetricsAggregator;
    use crate::events::{ConversationMarker, LlmSample, SttSample};

    #[test]
    fn renders_counts_sums_and_gauge() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.apply(&LlmSample::new("main", 100.0).with_total_tokens(10).into());
        aggregator.apply(&LlmSample::new("main", 50.5).with_total_tokens(20).into());
        aggregator.apply(
            &SttSample::new("deepgram", 80.0)
                .with_conversation(ConversationMarker::new("t-1"))
                .into(),
        );

        let text = render_prometheus(&aggregator.get_summary(), 2);

        assert!(text.contains("# TYPE voice_llm_duration_ms summary\n"));
        assert!(text.contains("voice_llm_duration_ms_count 2\n"));
        assert!(text.contains("voice_llm_duration_ms_sum 150.5\n"));
        assert!(text.contains("voice_stt_duration_ms_count 1\n"));
        assert!(text.contains("voice_tts_duration_ms_count 0\n"));
        assert!(text.contains("voice_total_tokens_total 30\n"));
        assert!(text.contains("voice_conversation_turns_total 1\n"));
        assert!(text.contains("# TYPE voice_active_conversations gauge\n"));
        assert!(text.contains("voice_active_conversations 2\n"));
    }
}
