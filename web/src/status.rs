//! Named HTTP status codes.
//!
//! Clients of the key desk API were written against this exact set of codes,
//! so handlers refer to these names rather than to raw `StatusCode` values.

use axum::http::StatusCode;

/// 200: request succeeded
pub const OK: StatusCode = StatusCode::OK;

/// 201: resource created
pub const CREATED: StatusCode = StatusCode::CREATED;

/// 400: malformed input or an operation invalid for the current state
pub const BAD_REQUEST: StatusCode = StatusCode::BAD_REQUEST;

/// 401: missing, invalid or expired credentials
pub const UNAUTHORIZED: StatusCode = StatusCode::UNAUTHORIZED;

/// 403: authenticated but not allowed
pub const FORBIDDEN: StatusCode = StatusCode::FORBIDDEN;

/// 404: referenced entity does not exist
pub const NOT_FOUND: StatusCode = StatusCode::NOT_FOUND;

/// 500: unexpected persistence or runtime failure
pub const SERVER_ERROR: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;
