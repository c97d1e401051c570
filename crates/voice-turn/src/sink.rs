use std::pin::Pin;

use futures::Stream;

/// Text fragments on their way to speech synthesis.
pub type SpeechStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Speech output of the host session.
pub trait SpeechSink: Send + Sync {
    /// Start speaking `text` as its fragments arrive. Returns without waiting
    /// for playout; the sink drives the stream on its own and may drop it
    /// early (e.g. on barge-in).
    fn say(&self, text: SpeechStream, add_to_history: bool);
}
