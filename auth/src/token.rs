//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs. The claims carry the account id and role so the
//! role check can run before the account is loaded; the account is still
//! loaded on every request so deleted accounts lose access immediately.

use crate::config::TokenConfig;
use crate::constants::BEARER_PREFIX;
use crate::error::{AuthError, Result};
use crate::role::Role;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: Uuid,
    /// Role at issue time.
    pub role: Role,
    /// Issued-at (seconds since the epoch).
    pub iat: i64,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    /// Build a service from its configuration.
    #[must_use]
    pub fn new(config: TokenConfig) -> Self {
        let encoding = EncodingKey::from_secret(config.secret());
        let decoding = DecodingKey::from_secret(config.secret());
        Self {
            config,
            encoding,
            decoding,
        }
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.config.ttl.num_seconds()
    }

    /// Issue a token for `user_id` valid from `issued_at` for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if encoding fails.
    pub fn issue(&self, user_id: Uuid, role: Role, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.config.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// Expiry is checked against the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] for an expired token and
    /// [`AuthError::InvalidToken`] for anything else that fails verification.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                kind => {
                    tracing::debug!(?kind, "Token rejected");
                    AuthError::InvalidToken
                },
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedHeader`] unless the value is `Bearer <token>`.
///
/// # Examples
///
/// ```
/// use kms_auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
/// assert!(bearer_token("Basic dXNlcg==").is_err());
/// ```
pub fn bearer_token(header_value: &str) -> Result<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn service() -> TokenService {
        TokenService::new(TokenConfig::new("test-secret-for-tokens"))
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let user = Uuid::new_v4();
        let now = Utc::now();

        let token = tokens.issue(user, Role::Admin, now).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 259_200);
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = service();
        let long_ago = Utc::now() - Duration::days(4);
        let token = tokens.issue(Uuid::new_v4(), Role::Employee, long_ago).unwrap();
        assert_eq!(tokens.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn foreign_signature_rejected() {
        let other = TokenService::new(TokenConfig::new("some-other-secret"));
        let token = other.issue(Uuid::new_v4(), Role::Admin, Utc::now()).unwrap();
        assert_eq!(service().verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_rejected() {
        assert_eq!(service().verify("not.a.jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn custom_ttl_applies() {
        let tokens = TokenService::new(TokenConfig::new("s3cret").with_ttl(Duration::hours(1)));
        assert_eq!(tokens.ttl_seconds(), 3600);
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer token-value").unwrap(), "token-value");
        assert_eq!(bearer_token("Bearer "), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token("bearer token"), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token("token"), Err(AuthError::MalformedHeader));
    }
}
