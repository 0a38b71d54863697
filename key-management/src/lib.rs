//! Key Management Service - the venue key desk backend of a university.
//!
//! Staff hand out venue keys to students and take them back; admins manage
//! venues, students and staff accounts. The service keeps every venue's
//! status in step with the order holding its keys.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)                 api/ handlers + auth/ extractors
//!        │                                  │
//!        │ reads and catalog writes         │ order writes
//!        ▼                                  ▼
//! ┌──────────────┐               ┌─────────────────────┐
//! │   Storage    │◀──────────────│  Booking lifecycle  │
//! │ (memory/pg)  │  BookingLedger│  (reducer + Store)  │
//! └──────────────┘   commits     └─────────────────────┘
//! ```
//!
//! # Booking invariants
//!
//! - A venue is `booked` exactly when one of its orders is `approved`
//! - Booking a venue is a compare-and-swap on its status, so two concurrent
//!   bookings of one venue cannot both succeed
//! - Order and venue change together in one atomic commit, or not at all
//!
//! See [`lifecycle`] for the reducer and its tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod config;
pub mod lifecycle;
pub mod server;
pub mod store;
pub mod types;
pub mod uploads;

pub use config::Config;
pub use lifecycle::{BookingAction, BookingError, BookingReducer};
pub use server::{AppState, build_router};
pub use store::{MemoryStore, PostgresStore, Storage};
pub use types::*;
