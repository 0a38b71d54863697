//! Bootstrap admin account.

use super::accounts::{NewAccount, build_account};
use crate::config::BootstrapAdmin;
use crate::store::{Storage, StoreError};
use crate::types::{Role, StaffNumber, User};
use anyhow::Context;
use chrono::{DateTime, Utc};
use kms_auth::CredentialHasher;
use kms_auth::utils::normalize_email;

/// Create the configured admin unless an account with that e-mail exists.
///
/// Returns the created account, or `None` when nothing had to be done.
///
/// # Errors
///
/// Fails when the configured values are invalid or storage refuses the
/// account (for example a taken staff number).
pub async fn ensure_admin(
    storage: &dyn Storage,
    hasher: CredentialHasher,
    admin: &BootstrapAdmin,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<User>> {
    let email = normalize_email(&admin.email);
    if storage
        .find_user_by_email(&email)
        .await
        .context("looking up bootstrap admin")?
        .is_some()
    {
        tracing::debug!(%email, "Bootstrap admin already exists");
        return Ok(None);
    }

    let registration_number = StaffNumber::parse(&admin.registration_number)
        .context("ADMIN_REGISTRATION_NUMBER")?;

    let user = build_account(
        hasher,
        NewAccount {
            firstname: admin.firstname.clone(),
            lastname: admin.lastname.clone(),
            email,
            registration_number,
            password: admin.password.clone(),
            role: Role::Admin,
        },
        now,
    )
    .await
    .map_err(|e| anyhow::anyhow!("invalid bootstrap admin: {}", e.message()))?;

    match storage.insert_user(user).await {
        Ok(user) => {
            tracing::info!(email = %user.email, "Bootstrap admin created");
            Ok(Some(user))
        },
        Err(StoreError::Conflict(message)) => {
            anyhow::bail!("bootstrap admin rejected: {message}")
        },
        Err(err) => Err(err).context("creating bootstrap admin"),
    }
}
