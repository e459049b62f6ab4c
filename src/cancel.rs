//! Cooperative cancellation.
//!
//! A run never blocks indefinitely: traversal and copy loops check the
//! caller's handle between files and directories and wind down with a
//! `Cancelled` outcome once it fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag shared between the caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent; clones observe the same flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let handle = CancelHandle::new();
        let other = handle.clone();

        assert!(!other.is_cancelled());
        handle.cancel();
        assert!(other.is_cancelled());

        // cancelling again changes nothing
        other.cancel();
        assert!(handle.is_cancelled());
    }
}
