//! Order API endpoints.
//!
//! Every write goes through the booking lifecycle store:
//! - POST /api/v1/orders - Book a venue for a student (staff)
//! - PUT /api/v1/orders/return/:id - Return a venue's keys (staff)
//! - PUT /api/v1/orders/status/:id - Set an order's status (staff)
//! - DELETE /api/v1/orders/:id - Delete an order (admin)
//!
//! Reads go straight to storage:
//! - GET /api/v1/orders - List orders, optionally by status (staff)
//! - GET /api/v1/orders/:id - Get order details (staff)

use super::ListQuery;
use crate::auth::{RequireAdmin, RequireStaff};
use crate::lifecycle::{BookingAction, BookingOutcome};
use crate::server::state::AppState;
use crate::store::Booking;
use crate::types::{Order, OrderId, OrderStatus, Page, StudentNumber, Venue, VenueId};
use axum::{Json, extract::State, http::StatusCode};
use kms_web::{ApiJson, ApiPath, ApiQuery, AppError, CorrelationId, WebResult, status};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to book a venue.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Venue to book
    pub venue_id: VenueId,
    /// Student taking the keys (string or integer)
    pub registration_number: StudentNumber,
}

/// Request carrying a target status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `pending` or `approved`
    pub status: String,
}

/// An order together with its venue after a lifecycle change.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// The order as stored
    pub order: Order,
    /// Its venue as stored
    pub venue: Venue,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            order: booking.order,
            venue: booking.venue,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Fresh id for one booking command, logged against the request's id.
///
/// Clients may resend a request id, so it cannot key the in-flight set.
fn command_id(CorrelationId(request_id): CorrelationId) -> Uuid {
    let correlation_id = Uuid::new_v4();
    tracing::debug!(%request_id, %correlation_id, "Dispatching booking command");
    correlation_id
}

/// Book a venue.
///
/// The venue must be available and the registration number must belong to a
/// signed-up student. The caller becomes the order's employee.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/orders \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"venueId": "550e8400-e29b-41d4-a716-446655440000", "registrationNumber": 12345678901234}'
/// ```
pub async fn create_order(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    request_id: CorrelationId,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> WebResult<(StatusCode, Json<Order>)> {
    let booking = state
        .dispatch(BookingAction::CreateOrder {
            correlation_id: command_id(request_id),
            venue_id: request.venue_id,
            registration_number: request.registration_number,
            requested_by: user.id,
        })
        .await?
        .into_booking()?;

    Ok((status::CREATED, Json(booking.order)))
}

/// Return a venue's keys.
///
/// The body must be `{"status": "pending"}` and the order must be approved.
pub async fn return_keys(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<OrderId>,
    request_id: CorrelationId,
    ApiJson(request): ApiJson<StatusRequest>,
) -> WebResult<Json<BookingResponse>> {
    let booking = state
        .dispatch(BookingAction::ReturnKeys {
            correlation_id: command_id(request_id),
            order_id,
            requested_status: request.status,
        })
        .await?
        .into_booking()?;

    Ok(Json(booking.into()))
}

/// Set an order's status.
///
/// Approving re-books the venue (and fails if someone else has it);
/// setting pending releases it.
pub async fn update_order_status(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<OrderId>,
    request_id: CorrelationId,
    ApiJson(request): ApiJson<StatusRequest>,
) -> WebResult<Json<Order>> {
    let status: OrderStatus = request.status.trim().parse()?;

    let booking = state
        .dispatch(BookingAction::UpdateOrderStatus {
            correlation_id: command_id(request_id),
            order_id,
            status,
        })
        .await?
        .into_booking()?;

    Ok(Json(booking.order))
}

/// Delete an order.
///
/// Admin only. Deleting an approved order frees its venue.
pub async fn delete_order(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<OrderId>,
    request_id: CorrelationId,
) -> WebResult<Json<Order>> {
    let outcome = state
        .dispatch(BookingAction::DeleteOrder {
            correlation_id: command_id(request_id),
            order_id,
        })
        .await?;

    match outcome {
        BookingOutcome::Deleted(order) => {
            tracing::info!(order_id = %order.id, admin = %admin.id, "Order deleted");
            Ok(Json(order))
        },
        other => Err(AppError::internal("Unexpected booking outcome")
            .with_source(anyhow::anyhow!("delete answered with {other:?}"))),
    }
}

/// List orders, newest first.
pub async fn list_orders(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> WebResult<Json<Page<Order>>> {
    let status = query.status::<OrderStatus>()?;
    let page = state.storage.list_orders(status, query.page()).await?;
    Ok(Json(page))
}

/// Get one order.
pub async fn get_order(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<OrderId>,
) -> WebResult<Json<Order>> {
    state
        .storage
        .find_order(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::missing("Order"))
}
