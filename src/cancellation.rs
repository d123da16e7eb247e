//! Cooperative cancellation.
//!
//! Cancellation in the transform core is polled, never preemptive: the
//! pipeline checks the token at pass boundaries within one declaration, and
//! the orchestrator checks it before starting each declaration of a batch.
//! A cancelled declaration surfaces as a distinct outcome, not an error, and
//! never exposes a partially-mutated tree.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A clonable, thread-safe cancellation flag.
///
/// All clones observe the same flag; cancelling one cancels them all.
///
/// # Examples
///
/// ```rust
/// use cillift::cancellation::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// assert!(!worker_token.is_cancelled());
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
