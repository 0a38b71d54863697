//! Authentication for the key desk API.
//!
//! - [`middleware`]: extractors enforcing a valid token and a role
//! - [`accounts`]: building validated staff accounts
//! - [`setup`]: bootstrap admin at start-up

pub mod accounts;
pub mod middleware;
pub mod setup;

pub use accounts::{NewAccount, build_account};
pub use middleware::{AuthUser, RequireAdmin, RequireStaff, auth_error};
pub use setup::ensure_admin;
