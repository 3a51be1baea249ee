//! Cooperative cancellation checked between plan and execution entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::warn;

/// Shared flag raised by Ctrl-C. In-flight calls are never interrupted; loops
/// poll the flag between entries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Raise this flag on Ctrl-C.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            warn!("interrupt received, stopping after the current entry");
            flag.cancel();
        })
        .context("install ctrl-c handler")
    }
}
