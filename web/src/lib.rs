//! Axum integration for the key management service.
//!
//! This crate holds the HTTP glue shared by every handler: the [`AppError`]
//! response type, the named status-code constants clients rely on, request
//! extractors, and the correlation-id middleware.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from the request (JSON, path, bearer token)
//! 3. **Build Action** from the extracted data
//! 4. **Dispatch** the action through a `Store` and wait for the outcome
//! 5. **Map result** to an HTTP response (or an [`AppError`])
//!
//! # Example
//!
//! ```ignore
//! use kms_web::{ApiJson, AppError, WebResult};
//!
//! async fn create_order(
//!     State(state): State<AppState>,
//!     ApiJson(request): ApiJson<CreateOrderRequest>,
//! ) -> WebResult<(StatusCode, Json<Order>)> {
//!     // ...
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod status;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, ApiQuery, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
