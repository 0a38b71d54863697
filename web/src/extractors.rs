//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id (middleware, header, or fresh)
//! - `ApiJson`, `ApiPath`, `ApiQuery`: the stock extractors with rejections
//!   turned into [`AppError`] so malformed input gets the usual JSON body
//!
//! # Examples
//!
//! ```ignore
//! use kms_web::extractors::{ApiJson, CorrelationId};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     ApiJson(request): ApiJson<ReturnKeysRequest>,
//! ) -> Result<Json<Order>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Returning keys");
//!     // ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by `correlation_id_layer`, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JSON body extractor rejecting with [`AppError`] (400 `VALIDATION_ERROR`).
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor rejecting with [`AppError`] (400 `BAD_REQUEST`).
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor rejecting with [`AppError`] (400 `BAD_REQUEST`).
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let header = uuid.to_string();
        let mut parts = parts_with(&[(CORRELATION_ID_HEADER, header.as_str())]);
        let id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.0, uuid);
    }

    #[tokio::test]
    async fn correlation_id_prefers_extension() {
        let from_layer = Uuid::new_v4();
        let header = Uuid::new_v4().to_string();
        let mut parts = parts_with(&[(CORRELATION_ID_HEADER, header.as_str())]);
        parts.extensions.insert(from_layer);
        let id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.0, from_layer);
    }

    #[tokio::test]
    async fn correlation_id_generated_when_absent() {
        let mut parts = parts_with(&[]);
        let id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_ne!(id.0, Uuid::nil());
    }
}
