//! Dashboard counters.
//!
//! - GET /api/v1/stats/total-venues
//! - GET /api/v1/stats/total-available
//! - GET /api/v1/stats/total-booked
//! - GET /api/v1/stats/summary
//!
//! All staff only.

use crate::auth::RequireStaff;
use crate::server::state::AppState;
use crate::types::{OrderStatus, VenueStatus};
use axum::{Json, extract::State};
use kms_web::WebResult;
use serde::Serialize;

/// A single count.
#[derive(Debug, Serialize)]
pub struct TotalResponse {
    /// Count
    pub total: u64,
}

/// Venue counts.
#[derive(Debug, Serialize)]
pub struct VenueCounts {
    /// All venues
    pub total: u64,
    /// Keys at the desk
    pub available: u64,
    /// Keys out
    pub booked: u64,
}

/// Order counts.
#[derive(Debug, Serialize)]
pub struct OrderCounts {
    /// All orders
    pub total: u64,
    /// Keys returned
    pub pending: u64,
    /// Keys out
    pub approved: u64,
}

/// Everything the dashboard shows at once.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Venue counts
    pub venues: VenueCounts,
    /// Order counts
    pub orders: OrderCounts,
    /// Signed-up students
    pub students: u64,
    /// Staff accounts
    pub users: u64,
}

async fn venue_total(state: &AppState, status: Option<VenueStatus>) -> WebResult<Json<TotalResponse>> {
    let total = state.storage.count_venues(status).await?;
    Ok(Json(TotalResponse { total }))
}

/// Number of venues.
pub async fn total_venues(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> WebResult<Json<TotalResponse>> {
    venue_total(&state, None).await
}

/// Number of venues whose keys are at the desk.
pub async fn total_available(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> WebResult<Json<TotalResponse>> {
    venue_total(&state, Some(VenueStatus::Available)).await
}

/// Number of venues whose keys are out.
pub async fn total_booked(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> WebResult<Json<TotalResponse>> {
    venue_total(&state, Some(VenueStatus::Booked)).await
}

/// All counts in one response.
pub async fn summary(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
) -> WebResult<Json<SummaryResponse>> {
    let storage = &state.storage;
    let (venues, available, booked) = tokio::try_join!(
        storage.count_venues(None),
        storage.count_venues(Some(VenueStatus::Available)),
        storage.count_venues(Some(VenueStatus::Booked)),
    )?;
    let (orders, pending, approved) = tokio::try_join!(
        storage.count_orders(None),
        storage.count_orders(Some(OrderStatus::Pending)),
        storage.count_orders(Some(OrderStatus::Approved)),
    )?;
    let (students, users) = tokio::try_join!(storage.count_students(), storage.count_users())?;

    Ok(Json(SummaryResponse {
        venues: VenueCounts {
            total: venues,
            available,
            booked,
        },
        orders: OrderCounts {
            total: orders,
            pending,
            approved,
        },
        students,
        users,
    }))
}
