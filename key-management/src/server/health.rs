//! Readiness endpoint.
//!
//! Liveness (`GET /health`) comes from `kms_web`; readiness also checks the
//! storage backend and whether the booking store still accepts commands.

use super::state::AppState;
use crate::lifecycle::BookingStats;
use axum::{Json, extract::State, http::StatusCode};
use kms_web::status;
use serde::Serialize;

/// Readiness check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Storage backend name
    pub backend: &'static str,
    /// Storage answered a ping
    pub storage: bool,
    /// Booking store is not shutting down
    pub accepting_commands: bool,
    /// Booking commands still running
    pub in_flight: usize,
    /// Booking effects still executing
    pub pending_effects: usize,
    /// Booking counters since start-up
    pub stats: BookingStats,
}

/// Readiness check endpoint.
///
/// Returns 200 when storage is reachable and the booking store accepts
/// commands, 500 otherwise. The body is the same in both cases.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health/ready
/// # {"ready":true,"backend":"memory","storage":true,"acceptingCommands":true,...}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let storage = match state.storage.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(backend = state.storage.backend(), error = %err, "Storage ping failed");
            false
        },
    };
    let accepting_commands = !state.booking.is_shutting_down();
    let (in_flight, stats) = state
        .booking
        .state(|s| (s.in_flight.len(), s.stats))
        .await;

    let ready = storage && accepting_commands;
    let code = if ready { status::OK } else { status::SERVER_ERROR };

    (
        code,
        Json(ReadinessResponse {
            ready,
            backend: state.storage.backend(),
            storage,
            accepting_commands,
            in_flight,
            pending_effects: state.booking.pending_effects(),
            stats,
        }),
    )
}
