//! Staff account API endpoints.
//!
//! - POST /api/v1/users/login - Exchange credentials for a bearer token (public)
//! - GET /api/v1/users/me - The signed-in account
//! - POST /api/v1/users - Create a staff account (admin)
//! - GET /api/v1/users, GET /api/v1/users/:id - List / get accounts (admin)
//! - DELETE /api/v1/users/:id - Delete an account (admin, never oneself)

use super::ListQuery;
use crate::auth::accounts::{check_password, reject_unknown_account};
use crate::auth::{AuthUser, NewAccount, RequireAdmin, auth_error, build_account};
use crate::server::state::AppState;
use crate::store::StoreError;
use crate::types::{Page, Role, StaffNumber, User, UserId};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use kms_auth::utils::normalize_email;
use kms_web::{ApiJson, ApiPath, ApiQuery, AppError, WebResult, status};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account e-mail (case-insensitive)
    pub email: String,
    /// Password
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Normalised e-mail
    pub email: String,
    /// Bearer token
    pub token: String,
}

/// New staff account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// Login e-mail
    pub email: String,
    /// 10-digit staff number (string or integer)
    pub registration_number: StaffNumber,
    /// Initial password
    pub password: String,
    /// `admin` or `employee` (default)
    pub role: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Log in.
///
/// An unknown e-mail and a wrong password give the same 401 after the
/// same amount of hashing work.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/v1/users/login \
///   -H "Content-Type: application/json" \
///   -d '{"email": "desk@campus.edu", "password": "correct horse"}'
/// # {"email":"desk@campus.edu","token":"eyJ..."}
/// ```
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> WebResult<Json<LoginResponse>> {
    let email = normalize_email(&request.email);
    let Some(user) = state.storage.find_user_by_email(&email).await? else {
        tracing::debug!(%email, "Login for unknown e-mail");
        return Err(reject_unknown_account(state.hasher, request.password).await);
    };

    check_password(state.hasher, request.password, user.password_hash.clone()).await?;

    // Expiry is verified against the system clock, so issue on it too
    let token = state
        .tokens
        .issue(*user.id.as_uuid(), user.role, Utc::now())
        .map_err(auth_error)?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(LoginResponse {
        email: user.email,
        token,
    }))
}

/// The signed-in account.
#[allow(clippy::unused_async)]
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// Create a staff account.
///
/// Admin only. E-mail and registration number must be unused.
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> WebResult<(StatusCode, Json<User>)> {
    let role = match request.role.as_deref().map(str::trim) {
        None | Some("") => Role::Employee,
        Some(raw) => raw.parse::<Role>().map_err(auth_error)?,
    };

    let user = build_account(
        state.hasher,
        NewAccount {
            firstname: request.firstname,
            lastname: request.lastname,
            email: request.email,
            registration_number: request.registration_number,
            password: request.password,
            role,
        },
        state.now(),
    )
    .await?;
    let user = state.storage.insert_user(user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, admin = %admin.id, "Staff account created");
    Ok((status::CREATED, Json(user)))
}

/// List accounts, newest first.
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> WebResult<Json<Page<User>>> {
    Ok(Json(state.storage.list_users(query.page()).await?))
}

/// Get one account.
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> WebResult<Json<User>> {
    state
        .storage
        .find_user(user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::missing("User"))
}

/// Delete an account.
///
/// Admin only; an admin cannot delete their own account. Orders keep the id
/// of the staff member who created them.
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
) -> WebResult<Json<User>> {
    if user_id == admin.id {
        return Err(AppError::invalid_state("You cannot delete your own account"));
    }

    let user = state
        .storage
        .delete_user(user_id)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => AppError::missing("User"),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, admin = %admin.id, "Staff account deleted");
    Ok(Json(user))
}
