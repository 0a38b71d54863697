//! Student API endpoints.
//!
//! - POST /api/v1/students - Student signup (public)
//! - GET /api/v1/students - List students (staff)
//! - GET /api/v1/students/:id - Get a student (staff)
//! - DELETE /api/v1/students/:id - Delete a student (admin)

use super::ListQuery;
use crate::auth::{RequireAdmin, RequireStaff};
use crate::server::state::AppState;
use crate::store::StoreError;
use crate::types::{Page, Student, StudentId, StudentNumber};
use axum::{Json, extract::State, http::StatusCode};
use kms_web::{ApiJson, ApiPath, ApiQuery, AppError, WebResult, status};
use serde::Deserialize;

/// Student signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// 14-digit registration number (string or integer)
    pub registration_number: StudentNumber,
    /// Year of study, 1 to 7
    pub year_of_study: u8,
}

/// Sign a student up.
///
/// Public. Registration numbers are unique.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/students \
///   -H "Content-Type: application/json" \
///   -d '{"registrationNumber": "12345678901234", "yearOfStudy": 2}'
/// ```
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignUpRequest>,
) -> WebResult<(StatusCode, Json<Student>)> {
    let student = Student::new(request.registration_number, request.year_of_study, state.now())?;
    let student = state.storage.insert_student(student).await?;

    tracing::info!(student_id = %student.id, "Student signed up");
    Ok((status::CREATED, Json(student)))
}

/// List students, newest first.
pub async fn list_students(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> WebResult<Json<Page<Student>>> {
    Ok(Json(state.storage.list_students(query.page()).await?))
}

/// Get one student.
pub async fn get_student(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<StudentId>,
) -> WebResult<Json<Student>> {
    state
        .storage
        .find_student(student_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::missing("Student"))
}

/// Delete a student.
///
/// Admin only. Refused while the student holds keys.
pub async fn delete_student(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<StudentId>,
) -> WebResult<Json<Student>> {
    let student = state
        .storage
        .delete_student(student_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::missing("Student"),
            other => other.into(),
        })?;

    tracing::info!(student_id = %student.id, admin = %admin.id, "Student deleted");
    Ok(Json(student))
}
