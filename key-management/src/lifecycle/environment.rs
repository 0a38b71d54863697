//! Dependencies of the booking reducer.

use crate::store::BookingLedger;
use kms_core::environment::Clock;
use kms_runtime::retry::RetryPolicy;
use std::sync::Arc;

/// Ledger, clock and the retry policy for context loads.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Persistence
    pub ledger: Arc<dyn BookingLedger>,
    /// Time source for order timestamps
    pub clock: Arc<dyn Clock>,
    /// Applied to reads only; commits are never retried
    pub retry: RetryPolicy,
}

impl BookingEnvironment {
    /// Environment with the default retry policy.
    #[must_use]
    pub fn new(ledger: Arc<dyn BookingLedger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            retry: RetryPolicy::new(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
