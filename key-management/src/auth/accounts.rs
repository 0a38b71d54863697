//! Validated staff account creation.

use super::middleware::auth_error;
use crate::types::{Role, StaffNumber, User, UserId};
use chrono::{DateTime, Utc};
use kms_auth::password::validate_password;
use kms_auth::utils::{is_valid_email, normalize_email};
use kms_auth::{AuthError, CredentialHasher};
use kms_web::AppError;

/// Input for a new staff account.
#[derive(Clone)]
pub struct NewAccount {
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// Login e-mail (normalised before storage)
    pub email: String,
    /// 10-digit staff number
    pub registration_number: StaffNumber,
    /// Plain-text password
    pub password: String,
    /// Access tier
    pub role: Role,
}

/// Validate `input` and hash its password.
///
/// Hashing runs on the blocking pool; Argon2 is deliberately slow.
///
/// # Errors
///
/// 400 `VALIDATION_ERROR` for blank names, a malformed e-mail or a short
/// password; 500 if hashing fails.
pub async fn build_account(
    hasher: CredentialHasher,
    input: NewAccount,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let firstname = input.firstname.trim().to_string();
    let lastname = input.lastname.trim().to_string();
    if firstname.is_empty() {
        return Err(AppError::validation("First name is required"));
    }
    if lastname.is_empty() {
        return Err(AppError::validation("Last name is required"));
    }

    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email address"));
    }
    validate_password(&input.password).map_err(auth_error)?;

    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::internal("Password hashing failed").with_source(e.into()))?
        .map_err(auth_error)?;

    Ok(User {
        id: UserId::new(),
        firstname,
        lastname,
        email,
        registration_number: input.registration_number,
        password_hash,
        role: input.role,
        created_at: now,
    })
}

/// Check a login attempt.
///
/// # Errors
///
/// 401 "Invalid email or password" on a mismatch; 500 if the stored hash is
/// unreadable.
pub async fn check_password(
    hasher: CredentialHasher,
    password: String,
    stored_hash: String,
) -> Result<(), AppError> {
    let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
        .await
        .map_err(|e| AppError::internal("Password check failed").with_source(e.into()))?
        .map_err(auth_error)?;

    if matches {
        Ok(())
    } else {
        Err(auth_error(AuthError::InvalidCredentials))
    }
}

/// Reject a login for an e-mail with no account.
///
/// Runs one password verification first, so the answer takes as long as a
/// wrong password for a real account. The error is always the 401
/// "Invalid email or password".
pub async fn reject_unknown_account(hasher: CredentialHasher, password: String) -> AppError {
    if let Err(err) = tokio::task::spawn_blocking(move || hasher.verify_unknown(&password)).await {
        tracing::warn!(error = %err, "Decoy password check did not complete");
    }
    auth_error(AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kms_testing::test_time;

    fn input() -> NewAccount {
        NewAccount {
            firstname: " Ada ".to_string(),
            lastname: "Desk".to_string(),
            email: " Ada@Campus.EDU ".to_string(),
            registration_number: StaffNumber::parse("0123456789").unwrap(),
            password: "correct horse".to_string(),
            role: Role::Employee,
        }
    }

    #[tokio::test]
    async fn account_is_normalised_and_hashed() {
        let hasher = CredentialHasher::new();
        let user = build_account(hasher, input(), test_time()).await.unwrap();

        assert_eq!(user.firstname, "Ada");
        assert_eq!(user.email, "ada@campus.edu");
        assert_ne!(user.password_hash, "correct horse");

        check_password(hasher, "correct horse".to_string(), user.password_hash.clone())
            .await
            .unwrap();
        let err = check_password(hasher, "wrong horse".to_string(), user.password_hash)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid email or password");
    }

    #[tokio::test]
    async fn unknown_accounts_get_the_wrong_password_answer() {
        let hasher = CredentialHasher::new();
        let user = build_account(hasher, input(), test_time()).await.unwrap();

        let wrong = check_password(hasher, "wrong horse".to_string(), user.password_hash)
            .await
            .unwrap_err();
        let unknown = reject_unknown_account(hasher, "correct horse".to_string()).await;

        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(unknown.code(), wrong.code());
        assert_eq!(unknown.message(), wrong.message());
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let hasher = CredentialHasher::new();

        let short = NewAccount {
            password: "short".to_string(),
            ..input()
        };
        let err = build_account(hasher, short, test_time()).await.unwrap_err();
        assert_eq!(err.message(), "Password must be at least 8 characters");

        let bad_email = NewAccount {
            email: "not-an-email".to_string(),
            ..input()
        };
        assert!(build_account(hasher, bad_email, test_time()).await.is_err());

        let nameless = NewAccount {
            lastname: "  ".to_string(),
            ..input()
        };
        let err = build_account(hasher, nameless, test_time()).await.unwrap_err();
        assert_eq!(err.message(), "Last name is required");
    }
}
