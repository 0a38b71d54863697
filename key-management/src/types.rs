//! Domain types for the key management service.
//!
//! Identifiers, statuses, registration numbers, the four stored entities and
//! the pagination envelope shared by every list endpoint. JSON field names are
//! camelCase; statuses and roles are lowercase strings.

use chrono::{DateTime, Utc};
use kms_auth::constants::registration::{STAFF_DIGITS, STUDENT_DIGITS};
use kms_auth::utils::is_digit_string;
use kms_web::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use kms_auth::Role;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a venue
    VenueId
);
entity_id!(
    /// Unique identifier for an order
    OrderId
);
entity_id!(
    /// Unique identifier for a student
    StudentId
);
entity_id!(
    /// Unique identifier for a staff account
    UserId
);

// ============================================================================
// Validation
// ============================================================================

/// Input rejected before it reaches storage or the booking lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Create a validation error with a user-facing message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::validation(err.0)
    }
}

/// Longest accepted venue description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Largest venue capacity; the database column is a signed 32-bit integer.
pub const MAX_VENUE_CAPACITY: u32 = i32::MAX.unsigned_abs();

/// Most images a venue can carry.
pub const MAX_VENUE_IMAGES: usize = 3;

/// Accepted range for a student's year of study.
pub const YEARS_OF_STUDY: std::ops::RangeInclusive<u8> = 1..=7;

// ============================================================================
// Statuses
// ============================================================================

/// Whether a venue's keys are out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueStatus {
    /// Keys are at the desk
    Available,
    /// Keys are handed out against an approved order
    Booked,
}

impl VenueStatus {
    /// Lowercase wire and column name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
        }
    }
}

impl fmt::Display for VenueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VenueStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            other => Err(ValidationError::new(format!("Invalid venue status: {other}"))),
        }
    }
}

/// Order status. An approved order holds its venue's keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Keys returned (or not yet handed out)
    Pending,
    /// Keys handed out
    Approved,
}

impl OrderStatus {
    /// Lowercase wire and column name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    /// Venue status that mirrors an order in this status.
    #[must_use]
    pub const fn venue_status(self) -> VenueStatus {
        match self {
            Self::Pending => VenueStatus::Available,
            Self::Approved => VenueStatus::Booked,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(ValidationError::new(format!("Invalid order status: {other}"))),
        }
    }
}

// ============================================================================
// Registration numbers
// ============================================================================

/// Raw JSON form of a registration number: a string or a bare integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RegistrationInput {
    /// `"12345678901234"`
    Text(String),
    /// `12345678901234`
    Number(u64),
}

impl RegistrationInput {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

macro_rules! registration_number {
    ($(#[$meta:meta])* $name:ident, $digits:expr, $who:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "RegistrationInput", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Number of digits.
            pub const DIGITS: usize = $digits;

            /// Parse a registration number.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError`] unless `value` is exactly
            #[doc = concat!("[`", stringify!($name), "::DIGITS`] ASCII digits.")]
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                if is_digit_string(value, Self::DIGITS) {
                    Ok(Self(value.to_string()))
                } else {
                    Err(ValidationError::new(format!(
                        "{} registration number must be exactly {} digits",
                        $who,
                        Self::DIGITS
                    )))
                }
            }

            /// The digits as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<RegistrationInput> for $name {
            type Error = ValidationError;

            fn try_from(input: RegistrationInput) -> Result<Self, Self::Error> {
                Self::parse(&input.into_text())
            }
        }

        impl From<$name> for String {
            fn from(number: $name) -> Self {
                number.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

registration_number!(
    /// Student registration number: exactly 14 digits.
    StudentNumber,
    STUDENT_DIGITS,
    "Student"
);
registration_number!(
    /// Staff registration number: exactly 10 digits.
    StaffNumber,
    STAFF_DIGITS,
    "Staff"
);

// ============================================================================
// Venues
// ============================================================================

/// A bookable room whose keys are kept at the desk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    /// Venue id
    pub id: VenueId,
    /// Display name, unique across venues
    pub name: String,
    /// Short code shown on key tags
    pub abbreviation: String,
    /// Building block
    pub block: String,
    /// Seats
    pub capacity: u32,
    /// Free text, at most 500 characters
    pub description: String,
    /// Equipment in the room
    pub equipment: Vec<String>,
    /// Stored image paths
    pub images: Vec<String>,
    /// Changed only by the booking lifecycle
    pub status: VenueStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    /// New available venue from validated details.
    #[must_use]
    pub fn new(details: VenueDetails, images: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: VenueId::new(),
            name: details.name,
            abbreviation: details.abbreviation,
            block: details.block,
            capacity: details.capacity,
            description: details.description,
            equipment: details.equipment,
            images,
            status: VenueStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Editable details of this venue.
    #[must_use]
    pub fn details(&self) -> VenueDetails {
        VenueDetails {
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
            block: self.block.clone(),
            capacity: self.capacity,
            description: self.description.clone(),
            equipment: self.equipment.clone(),
        }
    }

    /// Copy of this venue with new details. Status and images are kept.
    #[must_use]
    pub fn with_details(&self, details: VenueDetails, now: DateTime<Utc>) -> Self {
        Self {
            name: details.name,
            abbreviation: details.abbreviation,
            block: details.block,
            capacity: details.capacity,
            description: details.description,
            equipment: details.equipment,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// The admin-editable part of a venue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenueDetails {
    /// Display name
    pub name: String,
    /// Short code
    pub abbreviation: String,
    /// Building block
    pub block: String,
    /// Seats
    pub capacity: u32,
    /// Free text
    pub description: String,
    /// Equipment list
    pub equipment: Vec<String>,
}

impl VenueDetails {
    /// Trim text fields, drop blank equipment entries and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a blank name, abbreviation or block,
    /// a zero or oversized capacity, or an over-long description.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let details = Self {
            name: self.name.trim().to_string(),
            abbreviation: self.abbreviation.trim().to_string(),
            block: self.block.trim().to_string(),
            capacity: self.capacity,
            description: self.description.trim().to_string(),
            equipment: self
                .equipment
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect(),
        };

        for (field, value) in [
            ("name", &details.name),
            ("abbreviation", &details.abbreviation),
            ("block", &details.block),
        ] {
            if value.is_empty() {
                return Err(ValidationError::new(format!("Venue {field} is required")));
            }
        }
        if details.capacity == 0 {
            return Err(ValidationError::new("Venue capacity must be greater than 0"));
        }
        if details.capacity > MAX_VENUE_CAPACITY {
            return Err(ValidationError::new(format!(
                "Venue capacity must be at most {MAX_VENUE_CAPACITY}"
            )));
        }
        if details.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::new(format!(
                "Venue description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }

        Ok(details)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// A booking: a student took a venue's keys, handed out by a staff member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id
    pub id: OrderId,
    /// Booked venue
    pub venue_id: VenueId,
    /// Student holding the keys
    #[serde(rename = "student")]
    pub student_id: StudentId,
    /// Staff member who created the order
    #[serde(rename = "employee")]
    pub employee_id: UserId,
    /// Pending or approved
    pub status: OrderStatus,
    /// When the booking was made
    pub booking_date: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A freshly booked order. Orders are approved on creation.
    #[must_use]
    pub fn approved(
        venue_id: VenueId,
        student_id: StudentId,
        employee_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            venue_id,
            student_id,
            employee_id,
            status: OrderStatus::Approved,
            booking_date: now,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Students
// ============================================================================

/// A student who can take keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Student id
    pub id: StudentId,
    /// Unique 14-digit registration number
    pub registration_number: StudentNumber,
    /// Year of study (1-7)
    pub year_of_study: u8,
    /// Signup time
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Validate and build a new student record.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the year of study is out of range.
    pub fn new(
        registration_number: StudentNumber,
        year_of_study: u8,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !YEARS_OF_STUDY.contains(&year_of_study) {
            return Err(ValidationError::new(format!(
                "Year of study must be between {} and {}",
                YEARS_OF_STUDY.start(),
                YEARS_OF_STUDY.end()
            )));
        }

        Ok(Self {
            id: StudentId::new(),
            registration_number,
            year_of_study,
            created_at: now,
        })
    }
}

// ============================================================================
// Staff accounts
// ============================================================================

/// A staff account (admin or key desk employee).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Account id
    pub id: UserId,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// Unique, stored lowercase
    pub email: String,
    /// Unique 10-digit registration number
    pub registration_number: StaffNumber,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Access tier
    pub role: Role,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Pagination
// ============================================================================

/// Default page size of list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A clamped page request (0-based page).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Clamp `page_size` into `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Items to skip
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Query-string pagination parameters.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageParams {
    /// Page number (0-indexed)
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100)
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Resolve defaults and limits.
    #[must_use]
    pub fn request(self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// One page of a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Items across all pages
    pub total: u64,
    /// Page number
    pub page: u32,
    /// Page size
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Cut one page out of an already filtered and sorted list.
    #[must_use]
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(usize::try_from(request.page_size()).unwrap_or(usize::MAX))
            .collect();

        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
        }
    }
}
