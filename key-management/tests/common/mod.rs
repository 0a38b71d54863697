//! Shared setup for the HTTP tests: the full router over an in-memory store.

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use axum_test::TestServer;
use chrono::Utc;
use key_management::{
    AppState, MemoryStore, Role, StaffNumber, Student, StudentNumber, User, UserId, Venue,
    VenueDetails, VenueId, build_router,
};
use kms_auth::{TokenConfig, TokenService};
use kms_core::environment::SystemClock;
use std::sync::Arc;
use tempfile::TempDir;

/// Signing secret used by every test server.
pub const TEST_SECRET: &str = "integration-test-secret";

/// Registration number of the seeded student.
pub const STUDENT_NUMBER: &str = "12345678901234";

/// A running app with one admin and one employee.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub admin: User,
    pub admin_token: String,
    pub employee: User,
    pub employee_token: String,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        kms_testing::init_test_tracing();

        let uploads = TempDir::new().expect("temp dir");
        let files = key_management::uploads::LocalFileStorage::new(uploads.path())
            .await
            .expect("upload dir");
        let tokens = TokenService::new(TokenConfig::new(TEST_SECRET));
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            tokens,
            Arc::new(files),
            Arc::new(SystemClock),
        )
        .with_max_image_bytes(1024);

        let admin = insert_staff(&state, "admin@campus.edu", "1000000001", Role::Admin).await;
        let employee = insert_staff(&state, "desk@campus.edu", "1000000002", Role::Employee).await;
        let admin_token = token_for(&state, &admin);
        let employee_token = token_for(&state, &employee);

        let server = TestServer::new(build_router(state.clone(), &[])).expect("test server");

        Self {
            server,
            state,
            admin,
            admin_token,
            employee,
            employee_token,
            _uploads: uploads,
        }
    }

    /// Available venue inserted straight into storage.
    pub async fn seed_venue(&self, name: &str) -> Venue {
        let details = VenueDetails {
            name: name.to_string(),
            abbreviation: "RA".to_string(),
            block: "B1".to_string(),
            capacity: 40,
            description: "Seminar room".to_string(),
            equipment: vec!["projector".to_string()],
        };
        self.state
            .storage
            .insert_venue(Venue::new(details, Vec::new(), Utc::now()))
            .await
            .expect("insert venue")
    }

    /// Student inserted straight into storage.
    pub async fn seed_student(&self, number: &str) -> Student {
        let student = Student::new(StudentNumber::parse(number).unwrap(), 2, Utc::now()).unwrap();
        self.state
            .storage
            .insert_student(student)
            .await
            .expect("insert student")
    }

    /// Current stored venue.
    pub async fn venue(&self, id: VenueId) -> Venue {
        self.state
            .storage
            .find_venue(id)
            .await
            .unwrap()
            .expect("venue exists")
    }
}

/// Staff account with a placeholder hash; tests authenticate with tokens.
pub async fn insert_staff(state: &AppState, email: &str, number: &str, role: Role) -> User {
    let user = User {
        id: UserId::new(),
        firstname: "Test".to_string(),
        lastname: "Staff".to_string(),
        email: email.to_string(),
        registration_number: StaffNumber::parse(number).unwrap(),
        password_hash: "not-a-real-hash".to_string(),
        role,
        created_at: Utc::now(),
    };
    state.storage.insert_user(user).await.expect("insert user")
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state
        .tokens
        .issue(*user.id.as_uuid(), user.role, Utc::now())
        .expect("issue token")
}
