//! Router configuration for the key management service.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{orders, stats, students, users, venues};
use crate::types::MAX_VENUE_IMAGES;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
};
use kms_web::{correlation_id_layer, handlers::health_check};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Room for the text fields of a venue form on top of its images.
const FORM_FIELDS_ALLOWANCE: usize = 64 * 1024;

/// Build the complete Axum router.
///
/// - `/health`, `/health/ready`: no authentication
/// - `/api/v1/...`: role checks happen in the handlers' extractors
///
/// `cors_origins` empty means no CORS layer (same-origin deployments).
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let venue_form_limit = state
        .max_image_bytes
        .saturating_mul(MAX_VENUE_IMAGES)
        .saturating_add(FORM_FIELDS_ALLOWANCE);

    let api_routes = Router::new()
        // Venues
        .route(
            "/venues",
            post(venues::create_venue)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(venue_form_limit))
                .get(venues::list_venues),
        )
        .route(
            "/venues/:id",
            get(venues::get_venue)
                .put(venues::update_venue)
                .delete(venues::delete_venue),
        )
        // Orders (booking lifecycle)
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route(
            "/orders/:id",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/orders/status/:id", put(orders::update_order_status))
        .route("/orders/return/:id", put(orders::return_keys))
        // Students
        .route(
            "/students",
            post(students::sign_up).get(students::list_students),
        )
        .route(
            "/students/:id",
            get(students::get_student).delete(students::delete_student),
        )
        // Staff accounts
        .route("/users/login", post(users::login))
        .route("/users/me", get(users::me))
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        // Stats
        .route("/stats/total-venues", get(stats::total_venues))
        .route("/stats/total-available", get(stats::total_available))
        .route("/stats/total-booked", get(stats::total_booked))
        .route("/stats/summary", get(stats::summary));

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer());

    match cors_layer(cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_needs_a_valid_origin() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_none());
        assert!(cors_layer(&["http://desk.campus.edu".to_string()]).is_some());
    }
}
