//! Cooperative stop signal shared by every long-running component.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle over a shared stop flag.
///
/// Nothing is interrupted mid-step: components check the flag at their
/// checkpoints (cycle start, before each item, before each generation
/// attempt) and wind down from there.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!handle.is_stopped());
        signal.trigger();
        assert!(handle.is_stopped());
    }
}
