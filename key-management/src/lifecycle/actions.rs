//! Actions of the booking lifecycle.

use super::error::BookingError;
use super::types::OrderIntent;
use crate::store::{Booking, BookingContext, OrderContext};
use crate::types::{Order, OrderId, OrderStatus, StudentNumber, UserId, VenueId};
use uuid::Uuid;

/// Commands, loaded context and terminal outcomes.
///
/// Every variant carries the `correlation_id` of the command it belongs to.
#[derive(Clone, Debug)]
pub enum BookingAction {
    // ========== Commands ==========
    /// Book a venue for a student.
    CreateOrder {
        /// Command id
        correlation_id: Uuid,
        /// Venue to book
        venue_id: VenueId,
        /// Student taking the keys
        registration_number: StudentNumber,
        /// Staff member handing the keys out
        requested_by: UserId,
    },

    /// Hand a venue's keys back. `requested_status` must be `pending`.
    ReturnKeys {
        /// Command id
        correlation_id: Uuid,
        /// Order being closed
        order_id: OrderId,
        /// Status sent by the client
        requested_status: String,
    },

    /// Move an order to `status`, keeping its venue in step.
    UpdateOrderStatus {
        /// Command id
        correlation_id: Uuid,
        /// Order to change
        order_id: OrderId,
        /// Target status
        status: OrderStatus,
    },

    /// Remove an order, releasing its venue if the keys are still out.
    DeleteOrder {
        /// Command id
        correlation_id: Uuid,
        /// Order to remove
        order_id: OrderId,
    },

    // ========== Loaded context ==========
    /// Venue and student for a `CreateOrder`.
    BookingContextLoaded {
        /// Command id
        correlation_id: Uuid,
        /// Requested venue
        venue_id: VenueId,
        /// Staff member handing the keys out
        requested_by: UserId,
        /// What storage returned
        context: BookingContext,
    },

    /// Order and venue for an order command.
    OrderContextLoaded {
        /// Command id
        correlation_id: Uuid,
        /// What the command wants
        intent: OrderIntent,
        /// `None` when the order does not exist
        context: Option<OrderContext>,
    },

    // ========== Terminal ==========
    /// A venue was booked.
    OrderCreated {
        /// Command id
        correlation_id: Uuid,
        /// New order and booked venue
        booking: Booking,
    },

    /// An order's status was written.
    OrderStatusChanged {
        /// Command id
        correlation_id: Uuid,
        /// Order and venue after the change
        booking: Booking,
    },

    /// An order was removed.
    OrderDeleted {
        /// Command id
        correlation_id: Uuid,
        /// The removed order
        order: Order,
    },

    /// The command was rejected or storage failed. Nothing was written.
    OperationFailed {
        /// Command id
        correlation_id: Uuid,
        /// Why
        error: BookingError,
    },
}

impl BookingAction {
    /// Id of the command this action belongs to.
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        match self {
            Self::CreateOrder { correlation_id, .. }
            | Self::ReturnKeys { correlation_id, .. }
            | Self::UpdateOrderStatus { correlation_id, .. }
            | Self::DeleteOrder { correlation_id, .. }
            | Self::BookingContextLoaded { correlation_id, .. }
            | Self::OrderContextLoaded { correlation_id, .. }
            | Self::OrderCreated { correlation_id, .. }
            | Self::OrderStatusChanged { correlation_id, .. }
            | Self::OrderDeleted { correlation_id, .. }
            | Self::OperationFailed { correlation_id, .. } => *correlation_id,
        }
    }

    /// Whether this action ends its command.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OrderCreated { .. }
                | Self::OrderStatusChanged { .. }
                | Self::OrderDeleted { .. }
                | Self::OperationFailed { .. }
        )
    }

    /// Whether this action starts a command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::CreateOrder { .. }
                | Self::ReturnKeys { .. }
                | Self::UpdateOrderStatus { .. }
                | Self::DeleteOrder { .. }
        )
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateOrder { .. } => "create_order",
            Self::ReturnKeys { .. } => "return_keys",
            Self::UpdateOrderStatus { .. } => "update_order_status",
            Self::DeleteOrder { .. } => "delete_order",
            Self::BookingContextLoaded { .. } => "booking_context_loaded",
            Self::OrderContextLoaded { .. } => "order_context_loaded",
            Self::OrderCreated { .. } => "order_created",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::OrderDeleted { .. } => "order_deleted",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}
