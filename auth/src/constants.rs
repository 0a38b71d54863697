//! Authentication constants.

/// Default bearer token lifetime: three days.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;

/// Shortest password accepted when creating an account.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Scheme prefix of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Digit counts of registration numbers.
pub mod registration {
    /// Student registration numbers.
    pub const STUDENT_DIGITS: usize = 14;

    /// Staff (user) registration numbers.
    pub const STAFF_DIGITS: usize = 10;
}
