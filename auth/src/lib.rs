//! # KMS Authentication & Authorization
//!
//! Credential and token primitives for the key desk staff accounts.
//!
//! ## Features
//!
//! - **Password hashing**: Argon2id PHC strings via [`CredentialHasher`]
//! - **Bearer tokens**: HS256 JWTs carrying the user id and [`Role`], via [`TokenService`]
//! - **Roles**: `admin` and `employee`, with the staff/admin checks routes need
//! - **Validators**: e-mail shape and fixed-length digit strings
//!
//! ## Example
//!
//! ```rust
//! use kms_auth::{CredentialHasher, Role, TokenConfig, TokenService};
//! use chrono::Utc;
//! use uuid::Uuid;
//!
//! # fn main() -> Result<(), kms_auth::AuthError> {
//! let hasher = CredentialHasher::new();
//! let hash = hasher.hash("correct horse battery")?;
//! assert!(hasher.verify("correct horse battery", &hash)?);
//!
//! let tokens = TokenService::new(TokenConfig::new("dev-secret-with-enough-entropy"));
//! let user_id = Uuid::new_v4();
//! let token = tokens.issue(user_id, Role::Employee, Utc::now())?;
//! let claims = tokens.verify(&token)?;
//! assert_eq!(claims.sub, user_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod password;
pub mod role;
pub mod token;
pub mod utils;

pub use config::TokenConfig;
pub use error::{AuthError, Result};
pub use password::CredentialHasher;
pub use role::Role;
pub use token::{Claims, TokenService, bearer_token};
