//! In-memory storage.
//!
//! All four tables sit behind a single `tokio::sync::RwLock`, so every ledger
//! commit runs under one write guard and is trivially atomic.

use super::{
    Booking, BookingContext, BookingLedger, OrderContext, OrderRepository, Storage, StoreError,
    StoreResult, StudentRepository, UserRepository, VenueRepository, booking_check, messages,
    release_check,
};
use crate::types::{
    Order, OrderId, OrderStatus, Page, PageRequest, Student, StudentId, StudentNumber, User,
    UserId, Venue, VenueId, VenueStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    venues: HashMap<VenueId, Venue>,
    students: HashMap<StudentId, Student>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
}

/// Storage backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl VenueRepository for MemoryStore {
    async fn insert_venue(&self, venue: Venue) -> StoreResult<Venue> {
        let mut tables = self.tables.write().await;
        if tables.venues.values().any(|v| v.name == venue.name) {
            return Err(StoreError::Conflict(messages::VENUE_NAME_TAKEN.to_string()));
        }
        tables.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn find_venue(&self, id: VenueId) -> StoreResult<Option<Venue>> {
        Ok(self.tables.read().await.venues.get(&id).cloned())
    }

    async fn list_venues(
        &self,
        status: Option<VenueStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Venue>> {
        let tables = self.tables.read().await;
        let venues = tables
            .venues
            .values()
            .filter(|v| status.is_none_or(|s| v.status == s))
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(venues, |v| v.created_at), page))
    }

    async fn update_venue(&self, venue: Venue) -> StoreResult<Venue> {
        let mut tables = self.tables.write().await;
        if tables
            .venues
            .values()
            .any(|v| v.id != venue.id && v.name == venue.name)
        {
            return Err(StoreError::Conflict(messages::VENUE_NAME_TAKEN.to_string()));
        }

        let stored = tables.venues.get_mut(&venue.id).ok_or(StoreError::NotFound)?;
        *stored = Venue {
            status: stored.status,
            images: std::mem::take(&mut stored.images),
            created_at: stored.created_at,
            ..venue
        };
        Ok(stored.clone())
    }

    async fn delete_venue(&self, id: VenueId) -> StoreResult<Venue> {
        let mut tables = self.tables.write().await;
        let venue = tables.venues.get(&id).ok_or(StoreError::NotFound)?;
        if venue.status == VenueStatus::Booked {
            return Err(StoreError::InvalidState(messages::VENUE_IN_USE.to_string()));
        }

        tables.orders.retain(|_, order| order.venue_id != id);
        tables.venues.remove(&id).ok_or(StoreError::NotFound)
    }

    async fn count_venues(&self, status: Option<VenueStatus>) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .venues
                .values()
                .filter(|v| status.is_none_or(|s| v.status == s))
                .count(),
        ))
    }
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn insert_student(&self, student: Student) -> StoreResult<Student> {
        let mut tables = self.tables.write().await;
        if tables
            .students
            .values()
            .any(|s| s.registration_number == student.registration_number)
        {
            return Err(StoreError::Conflict(
                messages::STUDENT_NUMBER_TAKEN.to_string(),
            ));
        }
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn find_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.tables.read().await.students.get(&id).cloned())
    }

    async fn find_student_by_number(
        &self,
        number: &StudentNumber,
    ) -> StoreResult<Option<Student>> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .values()
            .find(|s| &s.registration_number == number)
            .cloned())
    }

    async fn list_students(&self, page: PageRequest) -> StoreResult<Page<Student>> {
        let tables = self.tables.read().await;
        let students = tables.students.values().cloned().collect();
        Ok(Page::slice(newest_first(students, |s| s.created_at), page))
    }

    async fn delete_student(&self, id: StudentId) -> StoreResult<Student> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables
            .orders
            .values()
            .any(|o| o.student_id == id && o.status == OrderStatus::Approved)
        {
            return Err(StoreError::InvalidState(
                messages::STUDENT_HOLDS_KEYS.to_string(),
            ));
        }

        tables.orders.retain(|_, order| order.student_id != id);
        tables.students.remove(&id).ok_or(StoreError::NotFound)
    }

    async fn count_students(&self) -> StoreResult<u64> {
        Ok(count(self.tables.read().await.students.len()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(messages::EMAIL_TAKEN.to_string()));
        }
        if tables
            .users
            .values()
            .any(|u| u.registration_number == user.registration_number)
        {
            return Err(StoreError::Conflict(messages::STAFF_NUMBER_TAKEN.to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<Page<User>> {
        let tables = self.tables.read().await;
        let users = tables.users.values().cloned().collect();
        Ok(Page::slice(newest_first(users, |u| u.created_at), page))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<User> {
        self.tables
            .write()
            .await
            .users
            .remove(&id)
            .ok_or(StoreError::NotFound)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(count(self.tables.read().await.users.len()))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(orders, |o| o.created_at), page))
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .orders
                .values()
                .filter(|o| status.is_none_or(|s| o.status == s))
                .count(),
        ))
    }
}

#[async_trait]
impl BookingLedger for MemoryStore {
    async fn booking_context(
        &self,
        venue_id: VenueId,
        registration_number: &StudentNumber,
    ) -> StoreResult<BookingContext> {
        let tables = self.tables.read().await;
        Ok(BookingContext {
            venue: tables.venues.get(&venue_id).cloned(),
            student: tables
                .students
                .values()
                .find(|s| &s.registration_number == registration_number)
                .cloned(),
        })
    }

    async fn order_context(&self, order_id: OrderId) -> StoreResult<Option<OrderContext>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&order_id).map(|order| OrderContext {
            order: order.clone(),
            venue: tables.venues.get(&order.venue_id).cloned(),
        }))
    }

    async fn commit_booking(&self, order: Order) -> StoreResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&order.student_id) {
            return Err(StoreError::NotFound);
        }

        let venue = tables
            .venues
            .get_mut(&order.venue_id)
            .ok_or(StoreError::NotFound)?;
        booking_check(venue)?;
        venue.status = VenueStatus::Booked;
        venue.updated_at = order.created_at;
        let venue = venue.clone();

        tables.orders.insert(order.id, order.clone());
        Ok(Booking { order, venue })
    }

    async fn commit_transition(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let mut tables = self.tables.write().await;
        let Tables { venues, orders, .. } = &mut *tables;

        let order = orders.get_mut(&order_id).ok_or(StoreError::NotFound)?;
        if order.status != from {
            return Err(StoreError::InvalidState(messages::ORDER_CHANGED.to_string()));
        }
        let venue = venues.get_mut(&order.venue_id).ok_or(StoreError::NotFound)?;

        // Check before touching either record so a failed guard writes nothing.
        if from != to {
            match to {
                OrderStatus::Approved => booking_check(venue)?,
                OrderStatus::Pending => release_check(venue)?,
            }
        }

        order.status = to;
        order.updated_at = at;
        venue.status = to.venue_status();
        venue.updated_at = at;

        Ok(Booking {
            order: order.clone(),
            venue: venue.clone(),
        })
    }

    async fn commit_removal(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let mut tables = self.tables.write().await;
        let Tables { venues, orders, .. } = &mut *tables;

        let order = orders.get(&order_id).ok_or(StoreError::NotFound)?;
        if order.status != expected {
            return Err(StoreError::InvalidState(messages::ORDER_CHANGED.to_string()));
        }

        if expected == OrderStatus::Approved {
            let venue = venues.get_mut(&order.venue_id).ok_or(StoreError::NotFound)?;
            release_check(venue)?;
            venue.status = VenueStatus::Available;
            venue.updated_at = at;
        }

        orders.remove(&order_id).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl Storage for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
