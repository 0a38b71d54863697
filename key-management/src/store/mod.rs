//! Entity storage.
//!
//! Handlers reach storage through the repository traits below; the booking
//! lifecycle reaches it only through [`BookingLedger`], whose commits are the
//! sole writers of venue and order status. Each commit is atomic: either the
//! order and venue both change or neither does.
//!
//! Two implementations:
//!
//! - [`MemoryStore`]: one lock over all tables (development and tests)
//! - [`PostgresStore`]: one transaction per commit, guarded by conditional
//!   updates and a partial unique index on approved orders

use crate::types::{
    Order, OrderId, OrderStatus, Page, PageRequest, Student, StudentId, StudentNumber, User, UserId,
    Venue, VenueId, VenueStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kms_web::AppError;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness rule would be broken.
    #[error("{0}")]
    Conflict(String),

    /// A guarded update found the record in an unexpected status.
    #[error("{0}")]
    InvalidState(String),

    /// The backend failed (connection, query, decoding).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying an idempotent read could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Handlers that reach storage directly surface its errors this way.
///
/// A missing record addressed by id is normally caught by the handler with a
/// resource-specific message first; this is the fallback.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::missing("Resource"),
            StoreError::Conflict(message) => Self::new(
                kms_web::status::BAD_REQUEST,
                message,
                "CONFLICT".to_string(),
            ),
            StoreError::InvalidState(message) => Self::invalid_state(message),
            err @ StoreError::Backend(_) => Self::internal("Storage failure").with_source(err.into()),
        }
    }
}

/// Messages shared by both backends so clients see the same text.
pub mod messages {
    /// CAS on an available venue lost.
    pub const VENUE_ALREADY_BOOKED: &str = "Venue is already booked";
    /// Releasing a venue that is not booked.
    pub const VENUE_NOT_BOOKED: &str = "Venue is not booked";
    /// Deleting a venue whose keys are out.
    pub const VENUE_IN_USE: &str = "Cannot delete a booked venue";
    /// Deleting a student who holds keys.
    pub const STUDENT_HOLDS_KEYS: &str = "Cannot delete a student holding venue keys";
    /// An order changed between load and commit.
    pub const ORDER_CHANGED: &str = "Order status has changed, retry the request";
    /// Unique venue name.
    pub const VENUE_NAME_TAKEN: &str = "A venue with this name already exists";
    /// Unique student registration number.
    pub const STUDENT_NUMBER_TAKEN: &str = "A student with this registration number already exists";
    /// Unique staff e-mail.
    pub const EMAIL_TAKEN: &str = "Email is already in use";
    /// Unique staff registration number.
    pub const STAFF_NUMBER_TAKEN: &str = "A user with this registration number already exists";
}

// ============================================================================
// Repositories
// ============================================================================

/// Venue records. Status is never written here.
#[async_trait]
pub trait VenueRepository: Send + Sync {
    /// Insert a new venue.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the name is taken.
    async fn insert_venue(&self, venue: Venue) -> StoreResult<Venue>;

    /// Find a venue by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_venue(&self, id: VenueId) -> StoreResult<Option<Venue>>;

    /// List venues, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_venues(
        &self,
        status: Option<VenueStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Venue>>;

    /// Overwrite a venue's details (name, abbreviation, block, capacity,
    /// description, equipment). Stored status and images are kept.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Conflict`] on a name clash.
    async fn update_venue(&self, venue: Venue) -> StoreResult<Venue>;

    /// Delete a venue and its remaining (pending) orders.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], or [`StoreError::InvalidState`] when booked.
    async fn delete_venue(&self, id: VenueId) -> StoreResult<Venue>;

    /// Count venues, optionally by status.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn count_venues(&self, status: Option<VenueStatus>) -> StoreResult<u64>;
}

/// Student records.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Insert a new student.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the registration number is taken.
    async fn insert_student(&self, student: Student) -> StoreResult<Student>;

    /// Find a student by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>>;

    /// Find a student by registration number.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_student_by_number(&self, number: &StudentNumber)
    -> StoreResult<Option<Student>>;

    /// List students, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_students(&self, page: PageRequest) -> StoreResult<Page<Student>>;

    /// Delete a student and their pending orders.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], or [`StoreError::InvalidState`] while the
    /// student holds an approved order.
    async fn delete_student(&self, id: StudentId) -> StoreResult<Student>;

    /// Count students.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn count_students(&self) -> StoreResult<u64>;
}

/// Staff accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the e-mail or registration number is taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    /// Find an account by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Find an account by (normalised) e-mail.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// List accounts, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>>;

    /// Delete an account. Orders keep the id of the staff member who made them.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent.
    async fn delete_user(&self, id: UserId) -> StoreResult<User>;

    /// Count accounts.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn count_users(&self) -> StoreResult<u64>;
}

/// Read access to orders. Orders are written only through [`BookingLedger`].
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// List orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>>;

    /// Count orders, optionally by status.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64>;
}

// ============================================================================
// Booking ledger
// ============================================================================

/// What a booking decision needs to see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingContext {
    /// The requested venue, if it exists
    pub venue: Option<Venue>,
    /// The student with the requested registration number, if any
    pub student: Option<Student>,
}

/// An order together with the venue it references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderContext {
    /// The order
    pub order: Order,
    /// Its venue (absent only if storage is inconsistent)
    pub venue: Option<Venue>,
}

/// An order and its venue after a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    /// The order as stored
    pub order: Order,
    /// The venue as stored
    pub venue: Venue,
}

/// Persistence seam of the booking lifecycle.
///
/// Loads are plain reads. Every `commit_*` applies its whole change or
/// nothing, and re-checks the statuses it depends on at commit time so a
/// decision made on a stale read cannot double-book a venue.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Load the venue and the student for a new booking.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn booking_context(
        &self,
        venue_id: VenueId,
        registration_number: &StudentNumber,
    ) -> StoreResult<BookingContext>;

    /// Load an order and its venue.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] on backend failure.
    async fn order_context(&self, order_id: OrderId) -> StoreResult<Option<OrderContext>>;

    /// Book the order's venue (`available → booked`) and insert the order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidState`] when the venue is no longer available
    /// - [`StoreError::NotFound`] when the venue or student vanished
    async fn commit_booking(&self, order: Order) -> StoreResult<Booking>;

    /// Move an order `from → to` and its venue to the mirrored status.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidState`] when the order is no longer `from`, or
    ///   the venue cannot follow (already booked, or not booked on release)
    /// - [`StoreError::NotFound`] when the order or venue is gone
    async fn commit_transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Booking>;

    /// Delete an order still in `expected` status. Deleting an approved order
    /// releases its venue.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidState`] when the order's status changed
    /// - [`StoreError::NotFound`] when the order is gone
    async fn commit_removal(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Order>;
}

/// Everything the HTTP layer needs from a backend.
#[async_trait]
pub trait Storage:
    VenueRepository + StudentRepository + UserRepository + OrderRepository + BookingLedger
{
    /// Short backend name for logs and readiness output.
    fn backend(&self) -> &'static str;

    /// Check the backend is reachable.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when it is not.
    async fn ping(&self) -> StoreResult<()>;
}

/// Guard used by both backends when releasing a venue.
pub(crate) fn release_check(venue: &Venue) -> StoreResult<()> {
    if venue.status == VenueStatus::Booked {
        Ok(())
    } else {
        Err(StoreError::InvalidState(messages::VENUE_NOT_BOOKED.to_string()))
    }
}

/// Guard used by both backends when booking a venue.
pub(crate) fn booking_check(venue: &Venue) -> StoreResult<()> {
    if venue.status == VenueStatus::Available {
        Ok(())
    } else {
        Err(StoreError::InvalidState(messages::VENUE_ALREADY_BOOKED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kms_web::status;

    #[test]
    fn conflicts_are_400_with_their_own_code() {
        let err = AppError::from(StoreError::Conflict(messages::EMAIL_TAKEN.to_string()));
        assert_eq!(err.status(), status::BAD_REQUEST);
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.message(), "Email is already in use");
    }

    #[test]
    fn backend_failures_are_500_and_opaque() {
        let err = AppError::from(StoreError::Backend("connection refused".to_string()));
        assert_eq!(err.status(), status::SERVER_ERROR);
        assert_eq!(err.message(), "Storage failure");
    }

    #[test]
    fn guarded_update_failures_are_400() {
        let err = AppError::from(StoreError::InvalidState(
            messages::VENUE_ALREADY_BOOKED.to_string(),
        ));
        assert_eq!(err.status(), status::BAD_REQUEST);
        assert_eq!(err.message(), "Venue is already booked");
    }
}
