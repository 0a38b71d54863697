//! Store running the booking reducer, and the request/response helper the
//! HTTP layer uses to talk to it.

use super::{BookingAction, BookingEnvironment, BookingReducer, BookingState, DispatchError};
use crate::store::Booking;
use crate::types::Order;
use kms_runtime::Store;
use std::time::Duration;

/// Store for the booking lifecycle.
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// Broadcast capacity sized for many concurrent waiting handlers.
pub const BROADCAST_CAPACITY: usize = 1024;

/// Build the booking store.
#[must_use]
pub fn booking_store(environment: BookingEnvironment) -> BookingStore {
    Store::with_broadcast_capacity(
        BookingState::new(),
        BookingReducer::new(),
        environment,
        BROADCAST_CAPACITY,
    )
}

/// Successful end of a booking command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    /// A venue was booked
    Created(Booking),
    /// An order's status was written
    StatusChanged(Booking),
    /// An order was removed
    Deleted(Order),
}

/// Send a command and wait for its terminal action.
///
/// # Errors
///
/// - [`DispatchError::Rejected`] when the lifecycle refused the command
/// - [`DispatchError::Runtime`] on timeout or during shutdown. A timeout
///   only stops the wait; the command keeps running and may still commit.
pub async fn execute(
    store: &BookingStore,
    command: BookingAction,
    timeout: Duration,
) -> Result<BookingOutcome, DispatchError> {
    let correlation_id = command.correlation_id();
    let terminal = store
        .send_and_wait_for(
            command,
            move |action| action.is_terminal() && action.correlation_id() == correlation_id,
            timeout,
        )
        .await?;

    match terminal {
        BookingAction::OrderCreated { booking, .. } => Ok(BookingOutcome::Created(booking)),
        BookingAction::OrderStatusChanged { booking, .. } => {
            Ok(BookingOutcome::StatusChanged(booking))
        },
        BookingAction::OrderDeleted { order, .. } => Ok(BookingOutcome::Deleted(order)),
        BookingAction::OperationFailed { error, .. } => Err(DispatchError::Rejected(error)),
        other => Err(DispatchError::Unexpected(other.name())),
    }
}

impl BookingOutcome {
    /// The booking, for outcomes that carry one.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Unexpected`] for a deletion.
    pub fn into_booking(self) -> Result<Booking, DispatchError> {
        match self {
            Self::Created(booking) | Self::StatusChanged(booking) => Ok(booking),
            Self::Deleted(_) => Err(DispatchError::Unexpected("order_deleted")),
        }
    }
}
