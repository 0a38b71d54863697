//! Application state shared across HTTP handlers.

use crate::lifecycle::{
    BookingAction, BookingEnvironment, BookingOutcome, BookingStore, DispatchError, booking_store,
    execute,
};
use crate::store::Storage;
use crate::uploads::FileStorage;
use chrono::{DateTime, Utc};
use kms_auth::{CredentialHasher, TokenService};
use kms_core::environment::Clock;
use kms_web::AppError;
use std::sync::Arc;
use std::time::Duration;

/// Default wait for a booking command's outcome.
pub const DEFAULT_BOOKING_TIMEOUT: Duration = Duration::from_secs(10);

/// Default largest accepted venue image (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state.
///
/// Cheap to clone: every field is an `Arc` or `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Entity storage
    pub storage: Arc<dyn Storage>,
    /// Booking lifecycle store
    pub booking: Arc<BookingStore>,
    /// Bearer token issuance and verification
    pub tokens: Arc<TokenService>,
    /// Password hashing
    pub hasher: CredentialHasher,
    /// Venue images
    pub files: Arc<dyn FileStorage>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// How long handlers wait for a booking outcome
    pub booking_timeout: Duration,
    /// Largest accepted image in bytes
    pub max_image_bytes: usize,
}

impl AppState {
    /// Wire up state over one storage backend.
    ///
    /// The booking store gets its own handle on the same backend, so
    /// handlers and the lifecycle always see the same data.
    pub fn new<S>(
        storage: Arc<S>,
        tokens: TokenService,
        files: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: Storage + 'static,
    {
        let environment = BookingEnvironment::new(storage.clone(), Arc::clone(&clock));

        Self {
            storage,
            booking: Arc::new(booking_store(environment)),
            tokens: Arc::new(tokens),
            hasher: CredentialHasher::new(),
            files,
            clock,
            booking_timeout: DEFAULT_BOOKING_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Override the booking wait.
    #[must_use]
    pub const fn with_booking_timeout(mut self, timeout: Duration) -> Self {
        self.booking_timeout = timeout;
        self
    }

    /// Override the image size limit.
    #[must_use]
    pub const fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    /// Current time from the injected clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run a booking command to its outcome.
    ///
    /// # Errors
    ///
    /// The lifecycle's rejection, a timeout (500 `TIMEOUT`) or a shutdown
    /// error, as an [`AppError`]. A timeout does not roll anything back: the
    /// commit may have landed, so the answer says the outcome is unknown.
    pub async fn dispatch(&self, command: BookingAction) -> Result<BookingOutcome, AppError> {
        let correlation_id = command.correlation_id();
        let started = std::time::Instant::now();

        let outcome = execute(&self.booking, command, self.booking_timeout).await;

        metrics::histogram!("booking.dispatch.duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &outcome {
            Err(DispatchError::Runtime(kms_runtime::StoreError::Timeout)) => {
                tracing::warn!(%correlation_id, "Booking outcome not observed before the deadline");
            },
            Err(err) => {
                tracing::debug!(%correlation_id, error = %err, "Booking command did not succeed");
            },
            Ok(_) => {},
        }

        outcome.map_err(AppError::from)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.storage.backend())
            .field("booking_timeout", &self.booking_timeout)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}
