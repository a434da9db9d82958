// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation of in-progress runs.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::task::JoinHandle;

/// A shared flag that requests cancellation of a run.
///
/// Cancelling before or during planning aborts the run without invoking the build tool. Once the
/// build tool is running, output continues to be parsed until it exits; tests that didn't report
/// a result are then marked as skipped rather than failed.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a new flag that isn't cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Spawns a task that cancels `flag` when Ctrl-C is pressed.
///
/// Must be called from within a tokio runtime. Abort the returned handle to stop listening.
pub fn cancel_on_ctrl_c(flag: CancelFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("received Ctrl-C, cancelling run");
                flag.cancel();
            }
            Err(error) => {
                tracing::warn!("failed to listen for Ctrl-C: {error}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
