//! Lifecycle errors and their HTTP mapping.

use crate::store::StoreError;
use kms_web::AppError;
use thiserror::Error;

/// Why a booking command failed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BookingError {
    /// A referenced entity does not exist (payload names the entity).
    #[error("{0} not found")]
    NotFound(String),

    /// The current status does not allow the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    /// Map a storage error, naming the entity a `NotFound` refers to.
    #[must_use]
    pub fn from_store(err: StoreError, entity: &str) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound(entity.to_string()),
            StoreError::Conflict(message) | StoreError::InvalidState(message) => {
                Self::InvalidState(message)
            },
            StoreError::Backend(message) => Self::Storage(message),
        }
    }

    /// Label for the failure metric
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(entity) => Self::missing(entity),
            BookingError::InvalidState(message) => Self::invalid_state(message),
            BookingError::Storage(message) => {
                Self::internal("Storage failure").with_source(anyhow::anyhow!(message))
            },
        }
    }
}

/// Failure to get an answer for a command.
/// Answer for a command whose outcome was not observed in time.
pub const BOOKING_OUTCOME_UNKNOWN: &str =
    "Booking outcome unknown; check the order list before retrying";

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The lifecycle rejected the command.
    #[error(transparent)]
    Rejected(#[from] BookingError),

    /// The store did not accept the command or answer in time.
    #[error(transparent)]
    Runtime(#[from] kms_runtime::StoreError),

    /// A terminal action of an unexpected kind arrived.
    #[error("unexpected outcome {0}")]
    Unexpected(&'static str),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Rejected(err) => err.into(),
            // The commit may still land after the wait gives up
            DispatchError::Runtime(kms_runtime::StoreError::Timeout) => {
                Self::timeout(BOOKING_OUTCOME_UNKNOWN)
            },
            DispatchError::Runtime(kms_runtime::StoreError::ShutdownInProgress) => {
                Self::internal("Service is shutting down")
            },
            DispatchError::Runtime(err) => {
                Self::internal("Booking request failed").with_source(err.into())
            },
            DispatchError::Unexpected(kind) => Self::internal("Booking request failed")
                .with_source(anyhow::anyhow!("unexpected outcome {kind}")),
        }
    }
}
