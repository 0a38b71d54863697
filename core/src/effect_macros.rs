//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block body
///
/// # Example
///
/// ```rust,ignore
/// use kms_core::async_effect;
///
/// let ledger = Arc::clone(&env.ledger);
/// async_effect! {
///     match ledger.commit_booking(order).await {
///         Ok(order) => Some(BookingAction::OrderCreated { correlation_id, order }),
///         Err(e) => Some(BookingAction::OperationFailed { correlation_id, error: e.into() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move {
            $($body)*
        }))
    };
}
