//! Authentication extractors for the key desk API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use key_management::auth::{AuthUser, RequireAdmin, RequireStaff};
//!
//! // Any signed-in account
//! async fn me(AuthUser(user): AuthUser) -> Json<User> { Json(user) }
//!
//! // Admin or employee
//! async fn list_orders(RequireStaff(user): RequireStaff, ...) { ... }
//!
//! // Admin only
//! async fn delete_venue(RequireAdmin(admin): RequireAdmin, ...) { ... }
//! ```
//!
//! The account is loaded on every request, so a deleted account loses access
//! at once and role checks use the stored role, not the one in the token.

use crate::server::state::AppState;
use crate::types::{User, UserId};
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use kms_auth::{AuthError, bearer_token};
use kms_web::AppError;

/// Map an authentication error onto the HTTP taxonomy.
#[must_use]
pub fn auth_error(err: AuthError) -> AppError {
    match err {
        err if err.is_unauthenticated() => AppError::unauthorized(err.to_string()),
        err @ AuthError::InsufficientPermissions { .. } => AppError::forbidden(err.to_string()),
        err @ (AuthError::WeakPassword { .. } | AuthError::InvalidRole(_)) => {
            AppError::validation(err.to_string())
        },
        err => AppError::internal("Authentication failure").with_source(err.into()),
    }
}

/// The signed-in account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)
            .and_then(|value| value.to_str().map_err(|_| AuthError::MalformedHeader))
            .map_err(auth_error)?;

        let token = bearer_token(header_value).map_err(auth_error)?;
        let claims = state.tokens.verify(token).map_err(auth_error)?;

        let user = state
            .storage
            .find_user(UserId::from_uuid(claims.sub))
            .await?
            .ok_or_else(|| {
                tracing::debug!(user_id = %claims.sub, "Token for a deleted account");
                auth_error(AuthError::InvalidToken)
            })?;

        Ok(Self(user))
    }
}

/// A signed-in admin or employee.
#[derive(Debug, Clone)]
pub struct RequireStaff(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.role.is_staff() {
            return Err(auth_error(AuthError::InsufficientPermissions {
                required: "admin or employee".to_string(),
            }));
        }
        Ok(Self(user))
    }
}

/// A signed-in admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !user.role.is_admin() {
            tracing::debug!(user_id = %user.id, role = %user.role, "Admin route refused");
            return Err(auth_error(AuthError::InsufficientPermissions {
                required: "admin".to_string(),
            }));
        }
        Ok(Self(user))
    }
}
