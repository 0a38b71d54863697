//! Reducer for the booking lifecycle.

use super::{BookingAction, BookingEnvironment, BookingError, BookingState, OrderIntent};
use crate::store::{Booking, BookingContext, OrderContext, StoreError, messages};
use crate::types::{Order, OrderId, OrderStatus, StudentNumber, UserId, VenueId, VenueStatus};
use kms_core::async_effect;
use kms_core::effect::Effect;
use kms_core::reducer::Reducer;
use kms_runtime::retry::retry_when;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use uuid::Uuid;

/// `ReturnKeys` was sent with a status other than `pending`.
pub const INVALID_RETURN_STATUS: &str = "Invalid status for returning keys";

/// `ReturnKeys` on an order that is already pending.
pub const KEYS_ALREADY_RETURNED: &str = "Keys have already been returned";

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Decides every order and venue status change.
///
/// Commands start a context load; the loaded snapshot is checked here and,
/// if the command is allowed, turned into one ledger commit. The commit
/// re-checks statuses itself, so a decision made on a stale snapshot fails
/// instead of double-booking.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Emit `OperationFailed` through an effect so waiters observe it.
fn fail(correlation_id: Uuid, error: BookingError) -> Effects {
    smallvec![async_effect! {
        Some(BookingAction::OperationFailed { correlation_id, error })
    }]
}

fn load_booking_context(
    env: &BookingEnvironment,
    correlation_id: Uuid,
    venue_id: VenueId,
    registration_number: StudentNumber,
    requested_by: UserId,
) -> Effects {
    let ledger = Arc::clone(&env.ledger);
    let retry = env.retry;

    smallvec![async_effect! {
        let loaded = retry_when(
            &retry,
            || ledger.booking_context(venue_id, &registration_number),
            StoreError::is_transient,
        )
        .await;

        Some(match loaded {
            Ok(context) => BookingAction::BookingContextLoaded {
                correlation_id,
                venue_id,
                requested_by,
                context,
            },
            Err(err) => BookingAction::OperationFailed {
                correlation_id,
                error: BookingError::from_store(err, "Venue"),
            },
        })
    }]
}

fn load_order_context(
    env: &BookingEnvironment,
    correlation_id: Uuid,
    order_id: OrderId,
    intent: OrderIntent,
) -> Effects {
    let ledger = Arc::clone(&env.ledger);
    let retry = env.retry;

    smallvec![async_effect! {
        let loaded = retry_when(
            &retry,
            || ledger.order_context(order_id),
            StoreError::is_transient,
        )
        .await;

        Some(match loaded {
            Ok(context) => BookingAction::OrderContextLoaded {
                correlation_id,
                intent,
                context,
            },
            Err(err) => BookingAction::OperationFailed {
                correlation_id,
                error: BookingError::from_store(err, "Order"),
            },
        })
    }]
}

/// Check a booking request against the loaded snapshot.
///
/// Venue problems are reported before student problems: a booked venue is
/// rejected whoever the student is.
fn decide_booking(
    context: BookingContext,
    requested_by: UserId,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Order, BookingError> {
    let venue = context
        .venue
        .ok_or_else(|| BookingError::NotFound("Venue".to_string()))?;
    if venue.status == VenueStatus::Booked {
        return Err(BookingError::InvalidState(
            messages::VENUE_ALREADY_BOOKED.to_string(),
        ));
    }
    let student = context
        .student
        .ok_or_else(|| BookingError::NotFound("Student".to_string()))?;

    Ok(Order::approved(venue.id, student.id, requested_by, now))
}

/// What to do with a loaded order.
#[derive(Debug, PartialEq, Eq)]
enum OrderDecision {
    /// Nothing to write; answer with the current order and venue
    Unchanged(Booking),
    /// Move the order `from → to` (venue follows)
    Transition { from: OrderStatus, to: OrderStatus },
    /// Delete the order while it is still `expected`
    Remove { expected: OrderStatus },
}

fn decide_order(intent: OrderIntent, context: OrderContext) -> Result<OrderDecision, BookingError> {
    let OrderContext { order, venue } = context;

    if intent == OrderIntent::Delete {
        return Ok(OrderDecision::Remove {
            expected: order.status,
        });
    }

    let venue = venue.ok_or_else(|| BookingError::NotFound("Venue".to_string()))?;

    match intent {
        OrderIntent::ReturnKeys if order.status != OrderStatus::Approved => Err(
            BookingError::InvalidState(KEYS_ALREADY_RETURNED.to_string()),
        ),
        OrderIntent::ReturnKeys => Ok(OrderDecision::Transition {
            from: OrderStatus::Approved,
            to: OrderStatus::Pending,
        }),
        OrderIntent::SetStatus(to) if to == order.status => {
            Ok(OrderDecision::Unchanged(Booking { order, venue }))
        },
        OrderIntent::SetStatus(OrderStatus::Approved) if venue.status == VenueStatus::Booked => {
            Err(BookingError::InvalidState(
                messages::VENUE_ALREADY_BOOKED.to_string(),
            ))
        },
        OrderIntent::SetStatus(to) => Ok(OrderDecision::Transition {
            from: order.status,
            to,
        }),
        OrderIntent::Delete => Ok(OrderDecision::Remove {
            expected: order.status,
        }),
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let correlation_id = action.correlation_id();
        tracing::debug!(%correlation_id, action = action.name(), "Reducing booking action");

        if action.is_command() && !state.in_flight.insert(correlation_id) {
            tracing::warn!(%correlation_id, "Duplicate booking command ignored");
            return SmallVec::new();
        }
        if !action.is_command() && !action.is_terminal() && !state.is_in_flight(&correlation_id) {
            tracing::warn!(%correlation_id, "Context for unknown command dropped");
            return SmallVec::new();
        }

        match action {
            BookingAction::CreateOrder {
                venue_id,
                registration_number,
                requested_by,
                ..
            } => load_booking_context(
                env,
                correlation_id,
                venue_id,
                registration_number,
                requested_by,
            ),

            BookingAction::ReturnKeys {
                order_id,
                requested_status,
                ..
            } => match requested_status.trim().parse::<OrderStatus>() {
                Ok(OrderStatus::Pending) => {
                    load_order_context(env, correlation_id, order_id, OrderIntent::ReturnKeys)
                },
                _ => fail(
                    correlation_id,
                    BookingError::InvalidState(INVALID_RETURN_STATUS.to_string()),
                ),
            },

            BookingAction::UpdateOrderStatus {
                order_id, status, ..
            } => load_order_context(
                env,
                correlation_id,
                order_id,
                OrderIntent::SetStatus(status),
            ),

            BookingAction::DeleteOrder { order_id, .. } => {
                load_order_context(env, correlation_id, order_id, OrderIntent::Delete)
            },

            BookingAction::BookingContextLoaded {
                venue_id,
                requested_by,
                context,
                ..
            } => match decide_booking(context, requested_by, env.clock.now()) {
                Ok(order) => {
                    tracing::debug!(%correlation_id, %venue_id, order_id = %order.id, "Committing booking");
                    let ledger = Arc::clone(&env.ledger);
                    smallvec![async_effect! {
                        Some(match ledger.commit_booking(order).await {
                            Ok(booking) => BookingAction::OrderCreated { correlation_id, booking },
                            Err(err) => BookingAction::OperationFailed {
                                correlation_id,
                                error: BookingError::from_store(err, "Venue"),
                            },
                        })
                    }]
                },
                Err(error) => fail(correlation_id, error),
            },

            BookingAction::OrderContextLoaded {
                intent, context, ..
            } => {
                let Some(context) = context else {
                    return fail(correlation_id, BookingError::NotFound("Order".to_string()));
                };
                let order_id = context.order.id;
                let now = env.clock.now();
                let ledger = Arc::clone(&env.ledger);

                match decide_order(intent, context) {
                    Ok(OrderDecision::Unchanged(booking)) => smallvec![async_effect! {
                        Some(BookingAction::OrderStatusChanged { correlation_id, booking })
                    }],
                    Ok(OrderDecision::Transition { from, to }) => {
                        tracing::debug!(%correlation_id, %order_id, %from, %to, "Committing transition");
                        smallvec![async_effect! {
                            Some(match ledger.commit_transition(order_id, from, to, now).await {
                                Ok(booking) => BookingAction::OrderStatusChanged { correlation_id, booking },
                                Err(err) => BookingAction::OperationFailed {
                                    correlation_id,
                                    error: BookingError::from_store(err, "Order"),
                                },
                            })
                        }]
                    },
                    Ok(OrderDecision::Remove { expected }) => {
                        tracing::debug!(%correlation_id, %order_id, %expected, "Committing removal");
                        smallvec![async_effect! {
                            Some(match ledger.commit_removal(order_id, expected, now).await {
                                Ok(order) => BookingAction::OrderDeleted { correlation_id, order },
                                Err(err) => BookingAction::OperationFailed {
                                    correlation_id,
                                    error: BookingError::from_store(err, "Order"),
                                },
                            })
                        }]
                    },
                    Err(error) => fail(correlation_id, error),
                }
            },

            BookingAction::OrderCreated { ref booking, .. } => {
                if state.in_flight.remove(&correlation_id) {
                    state.stats.created += 1;
                    metrics::counter!("booking.orders.created").increment(1);
                    tracing::info!(
                        %correlation_id,
                        order_id = %booking.order.id,
                        venue_id = %booking.venue.id,
                        "Venue booked"
                    );
                }
                SmallVec::new()
            },

            BookingAction::OrderStatusChanged { ref booking, .. } => {
                if state.in_flight.remove(&correlation_id) {
                    state.stats.status_changes += 1;
                    tracing::info!(
                        %correlation_id,
                        order_id = %booking.order.id,
                        status = %booking.order.status,
                        venue_status = %booking.venue.status,
                        "Order status written"
                    );
                }
                SmallVec::new()
            },

            BookingAction::OrderDeleted { ref order, .. } => {
                if state.in_flight.remove(&correlation_id) {
                    state.stats.deletions += 1;
                    tracing::info!(%correlation_id, order_id = %order.id, "Order deleted");
                }
                SmallVec::new()
            },

            BookingAction::OperationFailed { ref error, .. } => {
                if state.in_flight.remove(&correlation_id) {
                    state.stats.failures += 1;
                    metrics::counter!("booking.operations.failed", "kind" => error.kind())
                        .increment(1);
                    match error {
                        BookingError::Storage(_) => {
                            tracing::error!(%correlation_id, %error, "Booking command failed");
                        },
                        _ => tracing::debug!(%correlation_id, %error, "Booking command rejected"),
                    }
                }
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StudentId, Venue, VenueDetails};
    use kms_testing::test_time;

    fn venue(status: VenueStatus) -> Venue {
        let details = VenueDetails {
            name: "Room A".to_string(),
            abbreviation: "RA".to_string(),
            block: "B1".to_string(),
            capacity: 30,
            description: String::new(),
            equipment: Vec::new(),
        };
        Venue {
            status,
            ..Venue::new(details, Vec::new(), test_time())
        }
    }

    fn order(venue: &Venue, status: OrderStatus) -> Order {
        Order {
            status,
            ..Order::approved(venue.id, StudentId::new(), UserId::new(), test_time())
        }
    }

    #[test]
    fn booked_venue_wins_over_missing_student() {
        let context = BookingContext {
            venue: Some(venue(VenueStatus::Booked)),
            student: None,
        };
        assert_eq!(
            decide_booking(context, UserId::new(), test_time()),
            Err(BookingError::InvalidState("Venue is already booked".to_string()))
        );
    }

    #[test]
    fn missing_venue_reported_first() {
        let context = BookingContext {
            venue: None,
            student: None,
        };
        assert_eq!(
            decide_booking(context, UserId::new(), test_time()),
            Err(BookingError::NotFound("Venue".to_string()))
        );
    }

    #[test]
    fn returning_pending_order_is_rejected() {
        let venue = venue(VenueStatus::Available);
        let context = OrderContext {
            order: order(&venue, OrderStatus::Pending),
            venue: Some(venue),
        };
        assert_eq!(
            decide_order(OrderIntent::ReturnKeys, context),
            Err(BookingError::InvalidState(KEYS_ALREADY_RETURNED.to_string()))
        );
    }

    #[test]
    fn same_status_write_is_a_no_op() {
        let venue = venue(VenueStatus::Booked);
        let order = order(&venue, OrderStatus::Approved);
        let context = OrderContext {
            order: order.clone(),
            venue: Some(venue.clone()),
        };
        assert_eq!(
            decide_order(OrderIntent::SetStatus(OrderStatus::Approved), context),
            Ok(OrderDecision::Unchanged(Booking { order, venue }))
        );
    }

    #[test]
    fn re_approving_needs_an_available_venue() {
        let venue = venue(VenueStatus::Booked);
        let context = OrderContext {
            order: order(&venue, OrderStatus::Pending),
            venue: Some(venue),
        };
        assert!(matches!(
            decide_order(OrderIntent::SetStatus(OrderStatus::Approved), context),
            Err(BookingError::InvalidState(_))
        ));
    }

    #[test]
    fn delete_does_not_need_the_venue() {
        let venue = venue(VenueStatus::Available);
        let context = OrderContext {
            order: order(&venue, OrderStatus::Pending),
            venue: None,
        };
        assert_eq!(
            decide_order(OrderIntent::Delete, context),
            Ok(OrderDecision::Remove {
                expected: OrderStatus::Pending
            })
        );
    }
}
