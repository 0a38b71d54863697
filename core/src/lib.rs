//! # KMS Core
//!
//! Core traits and types for the key management service.
//!
//! Every piece of business logic in the service is written as a reducer: a
//! pure function that takes the current state and an action, mutates the
//! state, and returns a list of effect *descriptions*. The runtime crate
//! executes those descriptions; reducers never perform I/O themselves.
//!
//! ## Core Concepts
//!
//! - **State**: In-memory state owned by a feature (in-flight operations, counters)
//! - **Action**: All possible inputs to a reducer (commands, loaded context, outcomes)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use kms_core::{effect::Effect, reducer::Reducer, SmallVec, smallvec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct CounterState {
//!     bookings: u64,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Booked,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Booked => state.bookings += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

mod effect_macros;

/// Reducer module - Core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold the decision logic of a feature and are trivially testable
/// because they never touch the network, the database or the clock directly.
pub mod reducer {
    use crate::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The unified input type (commands, loaded context, outcomes)
    /// - `Environment`: Injected dependencies (storage, clock, ...)
    pub trait Reducer: Send + Sync {
        /// The state type this reducer operates on
        type State: Clone + Send + Sync;

        /// The action type this reducer processes
        type Action: Send + 'static;

        /// The environment type containing injected dependencies
        type Environment: Send + Sync;

        /// Reduce an action into state changes and effects
        ///
        /// Effects are returned in a `SmallVec` sized for the common case of a
        /// handful of effects per action, which avoids a heap allocation on
        /// the hot path.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values describing work to be done. The store executes them
/// after the reducer returns and feeds any produced action back into the
/// reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes side effects to be executed
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation yielding an optional follow-up action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Short label used for metrics and logs
        #[must_use]
        pub const fn kind(&self) -> &'static str {
            match self {
                Effect::None => "none",
                Effect::Future(_) => "future",
            }
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Dependencies that would make a reducer impure (time, storage) are reached
/// through traits so tests can swap in deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time for deterministic testing
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Production
    /// let clock = SystemClock;
    ///
    /// // Test
    /// let clock = FixedClock::new(test_time());
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[derive(Debug)]
    enum Ping {
        Pong,
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Effect::<Ping>::None.kind(), "none");
        assert!(Effect::<Ping>::None.is_none());

        let fut: Effect<Ping> = Effect::Future(Box::pin(async { Some(Ping::Pong) }));
        assert_eq!(fut.kind(), "future");
        assert_eq!(format!("{fut:?}"), "Effect::Future(<future>)");
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
