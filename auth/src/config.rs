//! Token configuration.
//!
//! Values come from the application's configuration layer, never hardcoded.

use crate::constants::DEFAULT_TOKEN_TTL_SECONDS;
use chrono::Duration;

/// Bearer token configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret used to sign and verify tokens.
    secret: String,

    /// Token lifetime.
    ///
    /// Default: 3 days
    pub ttl: Duration,
}

impl TokenConfig {
    /// Create a configuration with the given signing secret and the default lifetime.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
        }
    }

    /// Set token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub(crate) fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

// The secret stays out of logs.
impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}
