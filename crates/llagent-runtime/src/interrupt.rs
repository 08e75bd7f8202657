//! Resettable interrupt shared down the agent chain.
//!
//! Triggering cancels the current generation, running tools, and any
//! subagents holding a token derived from the current one. A reset swaps in
//! a fresh token so the next message starts clean; setting the flag is
//! fire-and-forget, no one waits on it.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Shared, resettable interrupt flag.
#[derive(Debug, Default)]
pub struct Interrupt {
    inner: Mutex<CancellationToken>,
}

impl Interrupt {
    /// Fresh, untriggered interrupt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token (used to scope background subagents).
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            inner: Mutex::new(token),
        }
    }

    /// The token currently in effect.
    #[must_use]
    pub fn current(&self) -> CancellationToken {
        self.inner.lock().clone()
    }

    /// Whether the current token is cancelled.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.lock().is_cancelled()
    }

    /// Set the flag.
    pub fn trigger(&self) {
        self.inner.lock().cancel();
    }

    /// Swap in a fresh token for the next generation.
    pub fn reset(&self) {
        *self.inner.lock() = CancellationToken::new();
    }
}
