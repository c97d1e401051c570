use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Number of conversations currently running in this process.
///
/// Cloning shares the underlying value; each session holds a clone instead of
/// reaching for a global.
#[derive(Debug, Clone, Default)]
pub struct ActiveConversations {
    value: Arc<AtomicI64>,
}

impl ActiveConversations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn dec(&self) -> i64 {
        self.value.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}
