//! # Seatrush Core
//!
//! Core traits and types for the seatrush booking engine.
//!
//! This crate provides the fundamental abstractions for the reducer-based
//! architecture the booking flow is built on:
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer (user operations, timer
//!   ticks, fetch results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O, no hidden timers)
//! - Dependency Injection via Environment
//!
//! Every periodic process (countdown, seat attrition, waiting-room decay) is
//! an [`effect::Effect::Every`] value owned by the runtime's timer registry,
//! so cancellation is deterministic on every exit path.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Effect vector returned by reducers.
    ///
    /// Most reducers return between zero and four effects, so the inline
    /// capacity avoids allocation on the hot dispatch path.
    pub type Effects<A> = SmallVec<[Effect<A>; 4]>;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for BookingReducer {
    ///     type State = BookingState;
    ///     type Action = BookingAction;
    ///     type Environment = BookingEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut BookingState,
    ///         action: BookingAction,
    ///         env: &BookingEnvironment,
    ///     ) -> Effects<BookingAction> {
    ///         match action {
    ///             BookingAction::SelectSeat(id) => {
    ///                 // Business logic here
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
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
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// A vector of effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identity of a periodic timer started by [`Effect::Every`].
    ///
    /// Timer ids are fixed, named resources ("waiting.countdown",
    /// "fallback.attrition") rather than generated handles: re-registering
    /// an id replaces the running timer, and cancelling an id is idempotent.
    /// This makes timer ownership auditable in reducer code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TimerId(pub &'static str);

    impl std::fmt::Display for TimerId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store
    /// runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Named periodic timer: dispatch `action` every `period` until the
        /// timer is cancelled via [`Effect::Cancel`] or store shutdown.
        ///
        /// The first dispatch happens one full `period` after registration.
        /// Registering an id that is already running replaces the existing
        /// timer, so a timer registered "once for the life of a run" cannot
        /// be accidentally duplicated by a re-entrant start.
        Every {
            /// Stable identity used for cancellation
            id: TimerId,
            /// Tick period
            period: Duration,
            /// Action dispatched on every tick
            action: Box<Action>,
        },

        /// Cancel the periodic timer with the given id. No-op if the timer
        /// is not running.
        Cancel(TimerId),

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
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Every { id, period, action } => f
                    .debug_struct("Effect::Every")
                    .field("id", id)
                    .field("period", period)
                    .field("action", action)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// True for [`Effect::Every`] with the given id.
        #[must_use]
        pub fn starts_timer(&self, timer: TimerId) -> bool {
            matches!(self, Effect::Every { id, .. } if *id == timer)
        }

        /// True for [`Effect::Cancel`] with the given id.
        #[must_use]
        pub fn cancels_timer(&self, timer: TimerId) -> bool {
            matches!(self, Effect::Cancel(id) if *id == timer)
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Map the action type produced by this effect.
        ///
        /// This is the scoping primitive for reducer composition: a child
        /// reducer returns `Effect<ChildAction>`, and the parent embeds those
        /// into its own action space (typically with an enum constructor).
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + Clone + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.map(f.clone())).collect())
                },
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Every { id, period, action } => Effect::Every {
                    id,
                    period,
                    action: Box::new(f(*action)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
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
    /// Production uses [`SystemClock`]; tests inject a fixed clock so
    /// booked-ticket timestamps are deterministic.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// System clock backed by `Utc::now()`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of randomness for the contention simulation.
    ///
    /// All probabilistic behavior (seat takeover rolls, waiting-room decay,
    /// fallback attrition subsets) draws from this trait so a seeded or
    /// scripted source makes full runs reproducible.
    pub trait RandomSource: Send + Sync {
        /// Uniform value in `[0, 1)`.
        fn next_unit(&self) -> f64;

        /// Uniform integer in `[0, upper)`. Returns 0 when `upper` is 0.
        fn next_below(&self, upper: u64) -> u64;
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{Effect, TimerId};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum ChildAction {
        Tick,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum ParentAction {
        Child(ChildAction),
    }

    #[test]
    fn starts_timer_matches_by_id() {
        const COUNTDOWN: TimerId = TimerId("waiting.countdown");
        const DECAY: TimerId = TimerId("waiting.decay");

        let effect: Effect<ChildAction> = Effect::Every {
            id: COUNTDOWN,
            period: Duration::from_secs(1),
            action: Box::new(ChildAction::Tick),
        };

        assert!(effect.starts_timer(COUNTDOWN));
        assert!(!effect.starts_timer(DECAY));
        assert!(!Effect::<ChildAction>::None.starts_timer(COUNTDOWN));
    }

    #[test]
    fn timer_id_displays_name() {
        assert_eq!(TimerId("waiting.attrition").to_string(), "waiting.attrition");
    }

    #[test]
    fn map_rewraps_timer_actions_and_preserves_ids() {
        const TICK: TimerId = TimerId("test.tick");

        let every: Effect<ChildAction> = Effect::Every {
            id: TICK,
            period: Duration::from_secs(2),
            action: Box::new(ChildAction::Tick),
        };
        let mapped = every.map(ParentAction::Child);
        assert!(mapped.starts_timer(TICK));
        if let Effect::Every { period, action, .. } = mapped {
            assert_eq!(period, Duration::from_secs(2));
            assert_eq!(*action, ParentAction::Child(ChildAction::Tick));
        }

        let cancel: Effect<ChildAction> = Effect::Cancel(TICK);
        assert!(cancel.map(ParentAction::Child).cancels_timer(TICK));
    }

    #[test]
    fn map_recurses_into_grouped_effects() {
        let grouped: Effect<ChildAction> = Effect::Sequential(vec![
            Effect::None,
            Effect::Delay {
                duration: Duration::from_millis(50),
                action: Box::new(ChildAction::Tick),
            },
        ]);

        let mapped = grouped.map(ParentAction::Child);
        assert!(matches!(mapped, Effect::Sequential(_)));
        if let Effect::Sequential(effects) = mapped {
            assert_eq!(effects.len(), 2);
            assert!(matches!(effects[0], Effect::None));
            assert!(matches!(effects[1], Effect::Delay { .. }));
            if let Effect::Delay { duration, ref action } = effects[1] {
                assert_eq!(duration, Duration::from_millis(50));
                assert_eq!(**action, ParentAction::Child(ChildAction::Tick));
            }
        }
    }

    #[tokio::test]
    async fn map_rewraps_future_output() {
        let effect: Effect<ChildAction> =
            Effect::Future(Box::pin(async { Some(ChildAction::Tick) }));

        let mapped = effect.map(ParentAction::Child);
        assert!(matches!(mapped, Effect::Future(_)));
        if let Effect::Future(fut) = mapped {
            assert_eq!(fut.await, Some(ParentAction::Child(ChildAction::Tick)));
        }
    }
}
