//! API endpoints for the key management service.
//!
//! Handlers organized by resource:
//! - Venues: CRUD, multipart creation with images
//! - Orders: the booking lifecycle (create, return keys, status, delete)
//! - Students: signup and lookup
//! - Users: login and staff accounts
//! - Stats: venue counts for the dashboard

pub mod orders;
pub mod stats;
pub mod students;
pub mod users;
pub mod venues;

use crate::types::{PageParams, PageRequest, ValidationError};
use kms_web::AppError;
use serde::Deserialize;
use std::str::FromStr;

/// Query parameters shared by list endpoints.
///
/// `page` is 0-based; `page_size` defaults to 20 and is capped at 100.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page number
    pub page: Option<u32>,
    /// Items per page
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
    /// Status filter (venues and orders)
    pub status: Option<String>,
}

impl ListQuery {
    /// Resolved page request.
    #[must_use]
    pub fn page(&self) -> PageRequest {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
        .request()
    }

    /// Parsed status filter.
    ///
    /// # Errors
    ///
    /// 400 `VALIDATION_ERROR` for an unknown status.
    pub fn status<T>(&self) -> Result<Option<T>, AppError>
    where
        T: FromStr<Err = ValidationError>,
    {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(str::parse::<T>)
            .transpose()
            .map_err(AppError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_PAGE_SIZE, VenueStatus};

    #[test]
    fn defaults_when_empty() {
        let query = ListQuery::default();
        assert_eq!(query.page().page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.status::<VenueStatus>().unwrap(), None);
    }

    #[test]
    fn status_filter_is_parsed() {
        let query = ListQuery {
            status: Some("booked".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query.status::<VenueStatus>().unwrap(), Some(VenueStatus::Booked));

        let query = ListQuery {
            status: Some("lost".to_string()),
            ..ListQuery::default()
        };
        let err = query.status::<VenueStatus>().unwrap_err();
        assert_eq!(err.message(), "Invalid venue status: lost");
    }
}
