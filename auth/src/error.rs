//! Error types for authentication and authorization operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for authentication and authorization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// E-mail unknown or password wrong. The two are deliberately not distinguished.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No `Authorization` header was sent.
    #[error("Missing authorization header")]
    MissingToken,

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("Invalid authorization header format")]
    MalformedHeader,

    /// The token's lifetime has passed.
    #[error("Token has expired")]
    TokenExpired,

    /// Bad signature, wrong algorithm, or garbage.
    #[error("Invalid token")]
    InvalidToken,

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller's role is not allowed on this route.
    #[error("Insufficient permissions: {required}")]
    InsufficientPermissions {
        /// Role description the route requires
        required: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// Password shorter than the minimum length.
    #[error("Password must be at least {min_length} characters")]
    WeakPassword {
        /// Minimum accepted length
        min_length: usize,
    },

    /// Unknown role name.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Hashing or token encoding failed (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kms_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::Internal("argon2".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Returns `true` if the caller is not (or no longer) authenticated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kms_auth::AuthError;
    /// assert!(AuthError::TokenExpired.is_unauthenticated());
    /// assert!(!AuthError::InsufficientPermissions { required: "admin".into() }.is_unauthenticated());
    /// ```
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::MissingToken
                | Self::MalformedHeader
                | Self::TokenExpired
                | Self::InvalidToken
        )
    }
}
