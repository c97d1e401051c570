//! One-shot completion signal for a single filler generation.
//!
//! The writer side ([`FillerTask`]) moves through
//! `Pending -> Streaming -> {Resolved | Failed | Cancelled}`. The first
//! terminal state wins; later attempts are ignored. Any number of
//! [`FillerWaiter`]s can observe it, before or after the fact.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum FillerState {
    Pending,
    Streaming,
    Resolved(String),
    Failed { partial: String, error: String },
    Cancelled { partial: String },
}

impl FillerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Streaming)
    }

    pub fn outcome(&self) -> Option<FillerOutcome> {
        match self {
            Self::Pending | Self::Streaming => None,
            Self::Resolved(text) => Some(FillerOutcome::Resolved(text.clone())),
            Self::Failed { partial, error } => Some(FillerOutcome::Failed {
                partial: partial.clone(),
                error: error.clone(),
            }),
            Self::Cancelled { partial } => Some(FillerOutcome::Cancelled {
                partial: partial.clone(),
            }),
        }
    }
}

/// Terminal state of a filler generation.
#[derive(Debug, Clone, PartialEq)]
pub enum FillerOutcome {
    Resolved(String),
    Failed { partial: String, error: String },
    Cancelled { partial: String },
}

impl FillerOutcome {
    /// Text produced before the terminal state was reached.
    pub fn text(&self) -> &str {
        match self {
            Self::Resolved(text) => text,
            Self::Failed { partial, .. } | Self::Cancelled { partial } => partial,
        }
    }
}

/// Writer side. Clones share the same state.
#[derive(Debug, Clone)]
pub struct FillerTask {
    tx: Arc<watch::Sender<FillerState>>,
}

impl Default for FillerTask {
    fn default() -> Self {
        Self::new()
    }
}

impl FillerTask {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FillerState::Pending);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> FillerWaiter {
        FillerWaiter {
            rx: self.tx.subscribe(),
        }
    }

    pub fn state(&self) -> FillerState {
        self.tx.borrow().clone()
    }

    pub fn outcome(&self) -> Option<FillerOutcome> {
        self.tx.borrow().outcome()
    }

    pub fn mark_streaming(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == FillerState::Pending {
                *state = FillerState::Streaming;
                true
            } else {
                false
            }
        })
    }

    pub fn resolve(&self, text: String) -> bool {
        self.finish(FillerState::Resolved(text))
    }

    pub fn fail(&self, partial: String, error: String) -> bool {
        self.finish(FillerState::Failed { partial, error })
    }

    pub fn cancel(&self, partial: String) -> bool {
        self.finish(FillerState::Cancelled { partial })
    }

    /// Returns `false` if a terminal state had already been written.
    fn finish(&self, terminal: FillerState) -> bool {
        let written = self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = terminal;
                true
            }
        });

        if !written {
            log::debug!("filler task already terminal, ignoring late update");
        }
        written
    }
}

/// Reader side. Cheap to clone; every clone sees the same terminal state.
#[derive(Debug, Clone)]
pub struct FillerWaiter {
    rx: watch::Receiver<FillerState>,
}

impl FillerWaiter {
    /// Wait for the terminal state.
    ///
    /// If every writer is dropped first, the task counts as cancelled.
    pub async fn wait(&mut self) -> FillerOutcome {
        match self.rx.wait_for(FillerState::is_terminal).await {
            Ok(state) => state.outcome().unwrap_or(FillerOutcome::Cancelled {
                partial: String::new(),
            }),
            Err(_) => FillerOutcome::Cancelled {
                partial: String::new(),
            },
        }
    }

    pub fn current(&self) -> FillerState {
        self.rx.borrow().clone()
    }
}
