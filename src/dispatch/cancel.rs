//! Cooperative cancellation signals

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Checked by the orchestrator before each iteration and at every poll tick
pub trait CancelSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<F> CancelSignal for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Shared cancellation flag; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clone the underlying flag for sharing with signal handlers
    pub fn clone_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl CancelSignal for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Signal that never fires
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancelSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_clones_share_state() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_closure_signal() {
        let signal = || true;
        assert!(signal.is_cancelled());
        assert!(!NeverCancelled.is_cancelled());
    }
}
