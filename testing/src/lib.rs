//! # Seatrush Testing
//!
//! Testing utilities for the seatrush booking engine:
//!
//! - [`ReducerTest`]: fluent Given-When-Then harness for pure reducers
//! - [`mocks`]: deterministic environment implementations (fixed clock,
//!   seeded and scripted randomness) so contention runs are reproducible
//!
//! Reducers are pure functions, so most domain behavior is tested without a
//! running Store; the mocks exist to pin down the two injected sources of
//! nondeterminism (time and randomness).

pub mod mocks;

pub use reducer_test::ReducerTest;
pub use reducer_test::assertions;
