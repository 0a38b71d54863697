//! Booking lifecycle: the only code that changes order and venue status.
//!
//! # Architecture
//!
//! ```text
//! HTTP handler ── command (correlation_id) ──▶ BookingStore
//!                                               │
//!                              load context effect (BookingLedger read)
//!                                               │
//!                         *ContextLoaded ──▶ reducer decides (pure)
//!                                               │
//!                              commit effect (one atomic ledger write)
//!                                               │
//! HTTP handler ◀── terminal action ─────────────┘
//!   OrderCreated | OrderStatusChanged | OrderDeleted | OperationFailed
//! ```
//!
//! Every order status write goes through [`BookingLedger`] commits that move
//! the paired venue in the same step:
//!
//! | Operation               | Order              | Venue                  |
//! |-------------------------|--------------------|------------------------|
//! | create                  | new, `approved`    | `available → booked`   |
//! | return keys             | `approved → pending` | `booked → available` |
//! | set status (changed)    | `from → to`        | mirrors `to`           |
//! | delete approved order   | removed            | `booked → available`   |
//! | delete pending order    | removed            | untouched              |
//!
//! [`BookingLedger`]: crate::store::BookingLedger

pub mod actions;
pub mod environment;
pub mod error;
pub mod reducer;
pub mod store;
pub mod types;

pub use actions::BookingAction;
pub use environment::BookingEnvironment;
pub use error::{BookingError, DispatchError};
pub use reducer::BookingReducer;
pub use store::{BookingOutcome, BookingStore, booking_store, execute};
pub use types::{BookingState, BookingStats, OrderIntent};
