//! Password hashing with Argon2id.

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{AuthError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

/// Hashes and verifies account passwords.
///
/// Hashes are PHC strings (`$argon2id$v=19$...`), so parameters travel with
/// the hash and can be raised later without invalidating stored accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher;

impl CredentialHasher {
    /// Argon2id with the crate's default parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if hashing fails.
    pub fn hash(self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        Self::argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// Check a password against a stored PHC hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the stored hash cannot be parsed.
    pub fn verify(self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::Internal(format!("stored hash unreadable: {e}")))?;

        match Self::argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!("password verification failed: {e}"))),
        }
    }

    /// Spend one verification on a login for an account that does not exist.
    ///
    /// Always `false`. Checks the password against a throwaway hash so an
    /// unknown e-mail costs as much as a wrong password.
    pub fn verify_unknown(self, password: &str) -> bool {
        if let Some(hash) = decoy_hash() {
            let _ = self.verify(password, hash);
        }
        false
    }
}

/// Hash of a random password no account can have, made on first use.
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| {
            let password = SaltString::generate(&mut OsRng);
            CredentialHasher::new().hash(password.as_str()).ok()
        })
        .as_deref()
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] when the password is too short.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min_length: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = CredentialHasher::new();
        let hash = hasher.hash("keys-for-room-a").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("keys-for-room-a", &hash).unwrap());
        assert!(!hasher.verify("keys-for-room-b", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = CredentialHasher::new();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn unknown_accounts_never_verify() {
        let hasher = CredentialHasher::new();
        assert!(decoy_hash().is_some_and(|hash| hash.starts_with("$argon2id$")));
        assert!(!hasher.verify_unknown("keys-for-room-a"));
        assert!(!hasher.verify_unknown(""));
    }

    #[test]
    fn garbage_hash_is_internal_error() {
        let hasher = CredentialHasher::new();
        assert!(matches!(
            hasher.verify("pw", "not-a-phc-string"),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn short_passwords_rejected() {
        assert_eq!(
            validate_password("short"),
            Err(AuthError::WeakPassword { min_length: 8 })
        );
        assert!(validate_password("long-enough").is_ok());
    }
}
