//! `PostgreSQL` storage.
//!
//! Every ledger commit runs in one transaction. Status changes are
//! conditional updates (`... WHERE status = $expected`), and the partial
//! unique index `orders_one_approved_per_venue` backs the one-approved-order-
//! per-venue rule even if a caller bypasses the ledger.
//!
//! # Example
//!
//! ```no_run
//! use key_management::store::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgres://localhost/keys", 10, 30).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use super::{
    Booking, BookingContext, BookingLedger, OrderContext, OrderRepository, Storage, StoreError,
    StoreResult, StudentRepository, UserRepository, VenueRepository, messages,
};
use crate::types::{
    Order, OrderId, OrderStatus, Page, PageRequest, Role, StaffNumber, Student, StudentId,
    StudentNumber, User, UserId, Venue, VenueId, VenueStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

const VENUE_COLUMNS: &str = "id, name, abbreviation, block, capacity, description, equipment, \
                             images, status, created_at, updated_at";
const STUDENT_COLUMNS: &str = "id, registration_number, year_of_study, created_at";
const USER_COLUMNS: &str =
    "id, firstname, lastname, email, registration_number, password_hash, role, created_at";
const ORDER_COLUMNS: &str =
    "id, venue_id, student_id, employee_id, status, booking_date, created_at, updated_at";

/// Storage backed by a `PostgreSQL` pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the database is unreachable.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if migrations fail.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(map_sqlx)
    }
}

/// Translate driver errors, naming the violated uniqueness rule.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            match db_err.constraint() {
                Some("venues_name_key") => {
                    StoreError::Conflict(messages::VENUE_NAME_TAKEN.to_string())
                },
                Some("students_registration_number_key") => {
                    StoreError::Conflict(messages::STUDENT_NUMBER_TAKEN.to_string())
                },
                Some("users_email_key") => StoreError::Conflict(messages::EMAIL_TAKEN.to_string()),
                Some("users_registration_number_key") => {
                    StoreError::Conflict(messages::STAFF_NUMBER_TAKEN.to_string())
                },
                Some("orders_one_approved_per_venue") => {
                    StoreError::InvalidState(messages::VENUE_ALREADY_BOOKED.to_string())
                },
                _ => StoreError::Conflict(db_err.message().to_string()),
            }
        },
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => StoreError::NotFound,
        _ => StoreError::Backend(err.to_string()),
    }
}

fn decode_error(what: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unreadable {what} in database: {value}"))
}

fn capacity_column(capacity: u32) -> StoreResult<i32> {
    i32::try_from(capacity)
        .map_err(|_| StoreError::InvalidState(format!("Venue capacity {capacity} is out of range")))
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ============================================================================
// Rows
// ============================================================================

#[derive(FromRow)]
struct VenueRow {
    id: Uuid,
    name: String,
    abbreviation: String,
    block: String,
    capacity: i32,
    description: String,
    equipment: Vec<String>,
    images: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VenueRow> for Venue {
    type Error = StoreError;

    fn try_from(row: VenueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: VenueId::from_uuid(row.id),
            capacity: u32::try_from(row.capacity)
                .map_err(|_| decode_error("capacity", &row.capacity.to_string()))?,
            status: row
                .status
                .parse::<VenueStatus>()
                .map_err(|_| decode_error("venue status", &row.status))?,
            name: row.name,
            abbreviation: row.abbreviation,
            block: row.block,
            description: row.description,
            equipment: row.equipment,
            images: row.images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct StudentRow {
    id: Uuid,
    registration_number: String,
    year_of_study: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StudentId::from_uuid(row.id),
            registration_number: StudentNumber::parse(&row.registration_number)
                .map_err(|_| decode_error("student number", &row.registration_number))?,
            year_of_study: u8::try_from(row.year_of_study)
                .map_err(|_| decode_error("year of study", &row.year_of_study.to_string()))?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    firstname: String,
    lastname: String,
    email: String,
    registration_number: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            registration_number: StaffNumber::parse(&row.registration_number)
                .map_err(|_| decode_error("staff number", &row.registration_number))?,
            role: row
                .role
                .parse::<Role>()
                .map_err(|_| decode_error("role", &row.role))?,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    venue_id: Uuid,
    student_id: Uuid,
    employee_id: Uuid,
    status: String,
    booking_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            venue_id: VenueId::from_uuid(row.venue_id),
            student_id: StudentId::from_uuid(row.student_id),
            employee_id: UserId::from_uuid(row.employee_id),
            status: row
                .status
                .parse::<OrderStatus>()
                .map_err(|_| decode_error("order status", &row.status))?,
            booking_date: row.booking_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_into<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Venues
// ============================================================================

#[async_trait]
impl VenueRepository for PostgresStore {
    #[tracing::instrument(skip(self, venue), fields(venue_id = %venue.id))]
    async fn insert_venue(&self, venue: Venue) -> StoreResult<Venue> {
        let capacity = capacity_column(venue.capacity)?;
        let row: VenueRow = sqlx::query_as(&format!(
            "INSERT INTO venues ({VENUE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {VENUE_COLUMNS}"
        ))
        .bind(venue.id.as_uuid())
        .bind(&venue.name)
        .bind(&venue.abbreviation)
        .bind(&venue.block)
        .bind(capacity)
        .bind(&venue.description)
        .bind(&venue.equipment)
        .bind(&venue.images)
        .bind(venue.status.as_str())
        .bind(venue.created_at)
        .bind(venue.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.try_into()
    }

    async fn find_venue(&self, id: VenueId) -> StoreResult<Option<Venue>> {
        let row: Option<VenueRow> =
            sqlx::query_as(&format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(Venue::try_from).transpose()
    }

    async fn list_venues(
        &self,
        status: Option<VenueStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Venue>> {
        let status = status.map(VenueStatus::as_str);
        let rows: Vec<VenueRow> = sqlx::query_as(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(i64::from(page.page_size()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM venues WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(Page {
            items: rows_into(rows)?,
            total: to_count(total),
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    #[tracing::instrument(skip(self, venue), fields(venue_id = %venue.id))]
    async fn update_venue(&self, venue: Venue) -> StoreResult<Venue> {
        let capacity = capacity_column(venue.capacity)?;
        let row: Option<VenueRow> = sqlx::query_as(&format!(
            "UPDATE venues SET name = $2, abbreviation = $3, block = $4, capacity = $5, \
             description = $6, equipment = $7, updated_at = $8 \
             WHERE id = $1 \
             RETURNING {VENUE_COLUMNS}"
        ))
        .bind(venue.id.as_uuid())
        .bind(&venue.name)
        .bind(&venue.abbreviation)
        .bind(&venue.block)
        .bind(capacity)
        .bind(&venue.description)
        .bind(&venue.equipment)
        .bind(venue.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_venue(&self, id: VenueId) -> StoreResult<Venue> {
        let mut tx = self.begin().await?;

        let row: Option<VenueRow> = sqlx::query_as(&format!(
            "SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let venue = Venue::try_from(row.ok_or(StoreError::NotFound)?)?;
        if venue.status == VenueStatus::Booked {
            return Err(StoreError::InvalidState(messages::VENUE_IN_USE.to_string()));
        }

        // Pending orders go with the venue (ON DELETE CASCADE).
        sqlx::query("DELETE FROM venues WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(venue)
    }

    async fn count_venues(&self, status: Option<VenueStatus>) -> StoreResult<u64> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM venues WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status.map(VenueStatus::as_str))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(to_count(total))
    }
}

// ============================================================================
// Students
// ============================================================================

#[async_trait]
impl StudentRepository for PostgresStore {
    async fn insert_student(&self, student: Student) -> StoreResult<Student> {
        let row: StudentRow = sqlx::query_as(&format!(
            "INSERT INTO students ({STUDENT_COLUMNS}) VALUES ($1, $2, $3, $4) \
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student.id.as_uuid())
        .bind(student.registration_number.as_str())
        .bind(i16::from(student.year_of_study))
        .bind(student.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.try_into()
    }

    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let row: Option<StudentRow> =
            sqlx::query_as(&format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(Student::try_from).transpose()
    }

    async fn find_student_by_number(
        &self,
        number: &StudentNumber,
    ) -> StoreResult<Option<Student>> {
        let row: Option<StudentRow> = sqlx::query_as(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE registration_number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(Student::try_from).transpose()
    }

    async fn list_students(&self, page: PageRequest) -> StoreResult<Page<Student>> {
        let rows: Vec<StudentRow> = sqlx::query_as(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students \
             ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.page_size()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Page {
            items: rows_into(rows)?,
            total: self.count_students().await?,
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete_student(&self, id: StudentId) -> StoreResult<Student> {
        let mut tx = self.begin().await?;

        let row: Option<StudentRow> = sqlx::query_as(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let student = Student::try_from(row.ok_or(StoreError::NotFound)?)?;

        let (holding,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE student_id = $1 AND status = 'approved')",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        if holding {
            return Err(StoreError::InvalidState(
                messages::STUDENT_HOLDS_KEYS.to_string(),
            ));
        }

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(student)
    }

    async fn count_students(&self) -> StoreResult<u64> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(to_count(total))
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(user.registration_number.as_str())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.try_into()
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.page_size()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Page {
            items: rows_into(rows)?,
            total: self.count_users().await?,
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn count_users(&self) -> StoreResult<u64> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(to_count(total))
    }
}

// ============================================================================
// Orders
// ============================================================================

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id \
             LIMIT $2 OFFSET $3"
        ))
        .bind(status.map(OrderStatus::as_str))
        .bind(i64::from(page.page_size()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Page {
            items: rows_into(rows)?,
            total: self.count_orders(status).await?,
            page: page.page(),
            page_size: page.page_size(),
        })
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status.map(OrderStatus::as_str))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(to_count(total))
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Move a venue `from → to` inside `tx`, distinguishing a missing venue from
/// one in the wrong status.
async fn swap_venue_status(
    tx: &mut Transaction<'static, Postgres>,
    venue_id: VenueId,
    from: VenueStatus,
    to: VenueStatus,
    at: DateTime<Utc>,
) -> StoreResult<Venue> {
    let row: Option<VenueRow> = sqlx::query_as(&format!(
        "UPDATE venues SET status = $3, updated_at = $4 \
         WHERE id = $1 AND status = $2 \
         RETURNING {VENUE_COLUMNS}"
    ))
    .bind(venue_id.as_uuid())
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(at)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    if let Some(row) = row {
        return row.try_into();
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM venues WHERE id = $1")
        .bind(venue_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx)?;

    Err(match (exists, to) {
        (None, _) => StoreError::NotFound,
        (Some(_), VenueStatus::Booked) => {
            StoreError::InvalidState(messages::VENUE_ALREADY_BOOKED.to_string())
        },
        (Some(_), VenueStatus::Available) => {
            StoreError::InvalidState(messages::VENUE_NOT_BOOKED.to_string())
        },
    })
}

#[async_trait]
impl BookingLedger for PostgresStore {
    async fn booking_context(
        &self,
        venue_id: VenueId,
        registration_number: &StudentNumber,
    ) -> StoreResult<BookingContext> {
        Ok(BookingContext {
            venue: self.find_venue(venue_id).await?,
            student: self.find_student_by_number(registration_number).await?,
        })
    }

    async fn order_context(&self, order_id: OrderId) -> StoreResult<Option<OrderContext>> {
        let Some(order) = self.find_order(order_id).await? else {
            return Ok(None);
        };
        let venue = self.find_venue(order.venue_id).await?;
        Ok(Some(OrderContext { order, venue }))
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, venue_id = %order.venue_id))]
    async fn commit_booking(&self, order: Order) -> StoreResult<Booking> {
        let mut tx = self.begin().await?;

        let venue = swap_venue_status(
            &mut tx,
            order.venue_id,
            VenueStatus::Available,
            VenueStatus::Booked,
            order.created_at,
        )
        .await?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id.as_uuid())
        .bind(order.venue_id.as_uuid())
        .bind(order.student_id.as_uuid())
        .bind(order.employee_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.booking_date)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(Booking {
            order: row.try_into()?,
            venue,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn commit_transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let mut tx = self.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;
            return Err(if exists.is_some() {
                StoreError::InvalidState(messages::ORDER_CHANGED.to_string())
            } else {
                StoreError::NotFound
            });
        };
        let order = Order::try_from(row)?;

        let venue = swap_venue_status(
            &mut tx,
            order.venue_id,
            from.venue_status(),
            to.venue_status(),
            at,
        )
        .await?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(Booking { order, venue })
    }

    #[tracing::instrument(skip(self))]
    async fn commit_removal(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let mut tx = self.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "DELETE FROM orders WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(expected.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        let Some(row) = row else {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;
            return Err(if exists.is_some() {
                StoreError::InvalidState(messages::ORDER_CHANGED.to_string())
            } else {
                StoreError::NotFound
            });
        };
        let order = Order::try_from(row)?;

        if expected == OrderStatus::Approved {
            swap_venue_status(
                &mut tx,
                order.venue_id,
                VenueStatus::Booked,
                VenueStatus::Available,
                at,
            )
            .await?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(order)
    }
}

#[async_trait]
impl Storage for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_never_clamped() {
        assert_eq!(capacity_column(40), Ok(40));
        assert_eq!(capacity_column(2_147_483_647), Ok(i32::MAX));
        assert!(matches!(
            capacity_column(3_000_000_000),
            Err(StoreError::InvalidState(_))
        ));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(map_sqlx(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn pool_errors_are_transient_backend_errors() {
        let err = map_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn counts_never_go_negative() {
        assert_eq!(to_count(-1), 0);
        assert_eq!(to_count(7), 7);
    }
}
