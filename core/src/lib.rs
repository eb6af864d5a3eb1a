//! # Campus Core
//!
//! Core traits and types for the campus events portal.
//!
//! Business logic is written as reducers: pure functions that validate an
//! action against the current state, mutate the state in place, and return
//! descriptions of side effects for the runtime to execute.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a store
//! - **Action**: All possible inputs to a reducer (commands and the events they produce)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (clock, event store)
//!
//! ## Example
//!
//! ```ignore
//! use campus_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for RegistrationReducer {
//!     type State = PortalState;
//!     type Action = RegistrationAction;
//!     type Environment = PortalEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut PortalState,
//!         action: RegistrationAction,
//!         env: &PortalEnvironment,
//!     ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
//!         // Validate, apply, describe effects
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Domain event trait and the serialized wire format
pub mod event;

/// Event store abstraction
pub mod event_store;

/// Stream identifiers and versions
pub mod stream;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero to two effects, so the result is stored
        /// inline without a heap allocation.
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
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Lift an effect into a wider action type.
        ///
        /// Used by parent reducers that delegate to child reducers: the child's
        /// feedback actions are wrapped into the parent's action enum.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            Action: Send + 'static,
            B: Send + 'static,
            F: FnOnce(Action) -> B + Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Future(fut) => Effect::Future(Box::pin(async move { fut.await.map(f) })),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Deadline checks and attendance timestamps read time only through this
    /// trait, so tests can pin "now" with a fixed clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};

    #[derive(Debug, Clone, PartialEq)]
    enum Inner {
        Ping,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Outer {
        Wrapped(Inner),
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn map_keeps_none() {
        let effect: Effect<Inner> = Effect::None;
        assert!(matches!(effect.map(Outer::Wrapped), Effect::None));
    }

    #[tokio::test]
    async fn map_wraps_future_output() {
        let effect: Effect<Inner> = Effect::Future(Box::pin(async { Some(Inner::Ping) }));

        let Effect::Future(fut) = effect.map(Outer::Wrapped) else {
            panic!("expected a future effect");
        };
        assert_eq!(fut.await, Some(Outer::Wrapped(Inner::Ping)));
    }
}
