//! Booking lifecycle over HTTP: create, return keys, status changes, delete.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{STUDENT_NUMBER, TestApp};
use key_management::{OrderStatus, VenueStatus};
use kms_web::status;
use serde_json::{Value, json};

async fn book(app: &TestApp, venue_id: &str, registration_number: Value) -> axum_test::TestResponse {
    app.server
        .post("/api/v1/orders")
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "venueId": venue_id, "registrationNumber": registration_number }))
        .await
}

#[tokio::test]
async fn booking_a_venue_approves_the_order_and_books_the_venue() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    let student = app.seed_student(STUDENT_NUMBER).await;

    let response = book(&app, &venue.id.to_string(), json!(12_345_678_901_234_u64)).await;

    assert_eq!(response.status_code(), status::CREATED);
    let order: Value = response.json();
    assert_eq!(order["status"], "approved");
    assert_eq!(order["venueId"], venue.id.to_string());
    assert_eq!(order["student"], student.id.to_string());
    assert_eq!(order["employee"], app.employee.id.to_string());
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Booked);
}

#[tokio::test]
async fn booking_a_booked_venue_is_rejected() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;

    let first = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;
    assert_eq!(first.status_code(), status::CREATED);

    let second = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;
    assert_eq!(second.status_code(), status::BAD_REQUEST);
    let body: Value = second.json();
    assert_eq!(body["message"], "Venue is already booked");
}

#[tokio::test]
async fn booked_venue_is_rejected_even_for_unknown_students() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;

    let response = book(&app, &venue.id.to_string(), json!("99999999999999")).await;
    assert_eq!(response.status_code(), status::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_student_is_404_and_changes_nothing() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;

    let response = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;

    assert_eq!(response.status_code(), status::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Student not found");
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Available);
    assert_eq!(app.state.storage.count_orders(None).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_venue_is_404() {
    let app = TestApp::new().await;
    app.seed_student(STUDENT_NUMBER).await;

    let response = book(&app, &uuid::Uuid::new_v4().to_string(), json!(STUDENT_NUMBER)).await;

    assert_eq!(response.status_code(), status::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], "Venue not found");
}

#[tokio::test]
async fn malformed_registration_numbers_are_rejected_before_booking() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;

    for bad in [json!("123456789012345"), json!("1234567890"), json!("1234567890123x")] {
        let response = book(&app, &venue.id.to_string(), bad).await;
        assert_eq!(response.status_code(), status::BAD_REQUEST);
    }
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Available);
}

#[tokio::test]
async fn returning_keys_releases_the_venue_once() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .put(&format!("/api/v1/orders/return/{order_id}"))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;

    assert_eq!(response.status_code(), status::OK);
    let body: Value = response.json();
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["venue"]["status"], "available");
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Available);

    let again = app
        .server
        .put(&format!("/api/v1/orders/return/{order_id}"))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;
    assert_eq!(again.status_code(), status::BAD_REQUEST);
    let body: Value = again.json();
    assert_eq!(body["message"], "Keys have already been returned");
}

#[tokio::test]
async fn returning_keys_requires_pending_status() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();

    let response = app
        .server
        .put(&format!("/api/v1/orders/return/{}", order["id"].as_str().unwrap()))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "approved" }))
        .await;

    assert_eq!(response.status_code(), status::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid status for returning keys");
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Booked);
}

#[tokio::test]
async fn returned_venue_can_be_booked_again() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();

    app.server
        .put(&format!("/api/v1/orders/return/{}", order["id"].as_str().unwrap()))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;

    let rebooked = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;
    assert_eq!(rebooked.status_code(), status::CREATED);
}

#[tokio::test]
async fn status_updates_keep_the_venue_in_step() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();
    let path = format!("/api/v1/orders/status/{}", order["id"].as_str().unwrap());

    let pending = app
        .server
        .put(&path)
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;
    assert_eq!(pending.status_code(), status::OK);
    assert_eq!(pending.json::<Value>()["status"], "pending");
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Available);

    let approved = app
        .server
        .put(&path)
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "approved" }))
        .await;
    assert_eq!(approved.status_code(), status::OK);
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Booked);
}

#[tokio::test]
async fn re_approving_fails_when_the_venue_was_taken() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let first: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();
    let first_id = first["id"].as_str().unwrap().to_string();

    app.server
        .put(&format!("/api/v1/orders/return/{first_id}"))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;
    book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await;

    let response = app
        .server
        .put(&format!("/api/v1/orders/status/{first_id}"))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "approved" }))
        .await;

    assert_eq!(response.status_code(), status::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["message"], "Venue is already booked");
    let stored = app
        .state
        .storage
        .find_order(serde_json::from_value(json!(first_id)).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn unknown_status_is_a_validation_error() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();

    let response = app
        .server
        .put(&format!("/api/v1/orders/status/{}", order["id"].as_str().unwrap()))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "cancelled" }))
        .await;

    assert_eq!(response.status_code(), status::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn deleting_an_approved_order_releases_the_venue() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();
    let path = format!("/api/v1/orders/{}", order["id"].as_str().unwrap());

    let response = app
        .server
        .delete(&path)
        .authorization_bearer(&app.admin_token)
        .await;

    assert_eq!(response.status_code(), status::OK);
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Available);

    let gone = app
        .server
        .get(&path)
        .authorization_bearer(&app.admin_token)
        .await;
    assert_eq!(gone.status_code(), status::NOT_FOUND);
}

#[tokio::test]
async fn only_admins_delete_orders() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let order: Value = book(&app, &venue.id.to_string(), json!(STUDENT_NUMBER)).await.json();

    let response = app
        .server
        .delete(&format!("/api/v1/orders/{}", order["id"].as_str().unwrap()))
        .authorization_bearer(&app.employee_token)
        .await;

    assert_eq!(response.status_code(), status::FORBIDDEN);
    assert_eq!(app.venue(venue.id).await.status, VenueStatus::Booked);
}

#[tokio::test]
async fn concurrent_bookings_of_one_venue_yield_a_single_order() {
    let app = TestApp::new().await;
    let venue = app.seed_venue("Room A").await;
    app.seed_student(STUDENT_NUMBER).await;
    let venue_id = venue.id.to_string();

    let responses = futures::future::join_all(
        (0..8).map(|_| book(&app, &venue_id, json!(STUDENT_NUMBER))),
    )
    .await;

    let created = responses
        .iter()
        .filter(|r| r.status_code() == status::CREATED)
        .count();
    let rejected = responses
        .iter()
        .filter(|r| r.status_code() == status::BAD_REQUEST)
        .count();
    assert_eq!(created, 1);
    assert_eq!(rejected, 7);
    assert_eq!(
        app.state
            .storage
            .count_orders(Some(OrderStatus::Approved))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn orders_can_be_listed_by_status() {
    let app = TestApp::new().await;
    app.seed_student(STUDENT_NUMBER).await;
    let room_a = app.seed_venue("Room A").await;
    let room_b = app.seed_venue("Room B").await;
    let order: Value = book(&app, &room_a.id.to_string(), json!(STUDENT_NUMBER)).await.json();
    book(&app, &room_b.id.to_string(), json!(STUDENT_NUMBER)).await;
    app.server
        .put(&format!("/api/v1/orders/return/{}", order["id"].as_str().unwrap()))
        .authorization_bearer(&app.employee_token)
        .json(&json!({ "status": "pending" }))
        .await;

    let all: Value = app
        .server
        .get("/api/v1/orders")
        .authorization_bearer(&app.employee_token)
        .await
        .json();
    assert_eq!(all["total"], 2);

    let approved: Value = app
        .server
        .get("/api/v1/orders")
        .add_query_param("status", "approved")
        .authorization_bearer(&app.employee_token)
        .await
        .json();
    assert_eq!(approved["total"], 1);
    assert_eq!(approved["items"][0]["venueId"], room_b.id.to_string());
}
