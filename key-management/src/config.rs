//! Configuration management for the key management service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `main` calls `dotenvy::dotenv()` first, so a `.env` file works too.
//!
//! | Variable                    | Default            |
//! |-----------------------------|--------------------|
//! | `HOST` / `PORT`             | `0.0.0.0` / `8080` |
//! | `SHUTDOWN_TIMEOUT`          | `30` (seconds)     |
//! | `REQUEST_TIMEOUT`           | `10` (seconds)     |
//! | `CORS_ORIGINS`              | none (comma list)  |
//! | `DATABASE_URL`              | unset: in-memory   |
//! | `DATABASE_MAX_CONNECTIONS`  | `10`               |
//! | `DATABASE_CONNECT_TIMEOUT`  | `30` (seconds)     |
//! | `AUTH_JWT_SECRET`           | required           |
//! | `AUTH_TOKEN_TTL`            | `259200` (3 days)  |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset: no bootstrap |
//! | `UPLOAD_DIR`                | `uploads/venues`   |
//! | `UPLOAD_MAX_BYTES`          | `5242880` (5 MiB)  |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// `PostgreSQL` (optional)
    pub database: DatabaseConfig,
    /// Tokens and the bootstrap admin
    pub auth: AuthConfig,
    /// Venue images
    pub uploads: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// How long a handler waits for a booking command, in seconds
    pub request_timeout: u64,
    /// Allowed CORS origins; empty disables the CORS layer
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Booking wait as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Shutdown grace period as a [`Duration`]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL; `None` selects the in-memory store
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 3 days)
    pub token_ttl: u64,
    /// Bootstrap admin account, created at start-up if missing
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// The admin account created on first start.
#[derive(Clone)]
pub struct BootstrapAdmin {
    /// Login e-mail
    pub email: String,
    /// Initial password
    pub password: String,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// 10-digit staff number
    pub registration_number: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field(
                "bootstrap_admin",
                &self.bootstrap_admin.as_ref().map(|admin| &admin.email),
            )
            .finish()
    }
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory for venue images
    pub dir: String,
    /// Largest accepted image in bytes
    pub max_bytes: usize,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `AUTH_JWT_SECRET` is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(source);

        let bootstrap_admin = match (vars.text("ADMIN_EMAIL"), vars.text("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                firstname: vars.or("ADMIN_FIRSTNAME", "System"),
                lastname: vars.or("ADMIN_LASTNAME", "Administrator"),
                registration_number: vars.or("ADMIN_REGISTRATION_NUMBER", "0000000000"),
            }),
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                host: vars.or("HOST", "0.0.0.0"),
                port: vars.parse("PORT", 8080)?,
                shutdown_timeout: vars.parse("SHUTDOWN_TIMEOUT", 30)?,
                request_timeout: vars.parse("REQUEST_TIMEOUT", 10)?,
                cors_origins: vars
                    .text("CORS_ORIGINS")
                    .map(|list| {
                        list.split(',')
                            .map(str::trim)
                            .filter(|origin| !origin.is_empty())
                            .map(ToString::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: vars.text("DATABASE_URL"),
                max_connections: vars.parse("DATABASE_MAX_CONNECTIONS", 10)?,
                connect_timeout: vars.parse("DATABASE_CONNECT_TIMEOUT", 30)?,
            },
            auth: AuthConfig {
                jwt_secret: vars
                    .text("AUTH_JWT_SECRET")
                    .ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?,
                token_ttl: vars.parse("AUTH_TOKEN_TTL", 259_200)?, // 3 days
                bootstrap_admin,
            },
            uploads: UploadConfig {
                dir: vars.or("UPLOAD_DIR", "uploads/venues"),
                max_bytes: vars.parse("UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            },
        })
    }
}

/// Variable lookup with blank values treated as unset.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.text(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.text(name) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_source(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("AUTH_JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert!(config.server.cors_origins.is_empty());
        assert!(config.database.url.is_none());
        assert_eq!(config.auth.token_ttl, 259_200);
        assert!(config.auth.bootstrap_admin.is_none());
        assert_eq!(config.uploads.dir, "uploads/venues");
        assert_eq!(config.uploads.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn secret_is_required() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing("AUTH_JWT_SECRET")
        );
        assert_eq!(
            load(&[("AUTH_JWT_SECRET", "   ")]).unwrap_err(),
            ConfigError::Missing("AUTH_JWT_SECRET")
        );
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = load(&[("AUTH_JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("AUTH_JWT_SECRET", "s"),
            ("PORT", "3000"),
            ("DATABASE_URL", "postgres://db/keys"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
            ("ADMIN_EMAIL", "admin@campus.edu"),
            ("ADMIN_PASSWORD", "changeme123"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url.as_deref(), Some("postgres://db/keys"));
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        let admin = config.auth.bootstrap_admin.unwrap();
        assert_eq!(admin.email, "admin@campus.edu");
        assert_eq!(admin.registration_number, "0000000000");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = load(&[
            ("AUTH_JWT_SECRET", "top-secret-value"),
            ("ADMIN_EMAIL", "admin@campus.edu"),
            ("ADMIN_PASSWORD", "hunter2hunter2"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret-value"));
        assert!(!rendered.contains("hunter2hunter2"));
    }
}
