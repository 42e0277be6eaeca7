//! Cooperative cancellation for games running on a worker thread.
//!
//! The match runner owns the wall-clock ceiling; the game only has to poll the
//! token between turns and return once it has been cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Thread-safe cancellation flag shared between supervisor and game.
///
/// Cheap to clone; `is_cancelled()` is a single atomic load so games can call
/// it every turn.
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Shared stop flag
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod cancel_tests;
