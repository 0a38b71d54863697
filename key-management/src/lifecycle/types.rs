//! State of the booking lifecycle store.

use crate::types::OrderStatus;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// What an order command wants to do once the order is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderIntent {
    /// Hand the keys back (`approved → pending`)
    ReturnKeys,
    /// Move the order to a status
    SetStatus(OrderStatus),
    /// Remove the order
    Delete,
}

/// Operation counters since start-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    /// Orders created
    pub created: u64,
    /// Status changes committed (including no-op status writes)
    pub status_changes: u64,
    /// Orders deleted
    pub deletions: u64,
    /// Commands that ended in `OperationFailed`
    pub failures: u64,
}

/// Reducer state.
#[derive(Clone, Debug, Default)]
pub struct BookingState {
    /// Commands that have not reached a terminal action yet
    pub in_flight: HashSet<Uuid>,
    /// Counters
    pub stats: BookingStats,
}

impl BookingState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a command with this id is still running.
    #[must_use]
    pub fn is_in_flight(&self, correlation_id: &Uuid) -> bool {
        self.in_flight.contains(correlation_id)
    }
}
