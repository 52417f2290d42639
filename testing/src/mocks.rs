//! Deterministic environment mocks
//!
//! Time and randomness are the only sources of nondeterminism injected into
//! the booking reducers, so these mocks are enough to replay a full
//! contention run bit-for-bit.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seatrush_core::environment::{Clock, RandomSource};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a clock pinned to the given instant.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }

    /// A fixed clock at an arbitrary but stable instant.
    ///
    /// # Panics
    ///
    /// Never panics; the embedded timestamp is valid.
    #[must_use]
    #[allow(clippy::unwrap_used)] // constant timestamp is always valid
    pub fn default_instant() -> Self {
        Self::new(Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Seeded random source backed by [`StdRng`].
///
/// Two `SeededRandom` instances created from the same seed produce the same
/// sequence of draws, which is what makes full contention runs reproducible.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a source from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .r#gen::<f64>()
    }

    fn next_below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        self.rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .gen_range(0..upper)
    }
}

/// Scripted random source with separate queues per draw kind.
///
/// `next_unit` pops from the unit queue (default `1.0` once exhausted, i.e.
/// "never flips"); `next_below` pops from the below queue (default `0`).
/// Keeping the queues separate means interleaved decay draws cannot shift
/// the attrition script, so a test can force "seat A-1 flips on tick 4"
/// exactly.
#[derive(Default)]
pub struct StepRandom {
    units: Mutex<VecDeque<f64>>,
    belows: Mutex<VecDeque<u64>>,
}

impl StepRandom {
    /// Create an empty script (no flips, zero decay draws).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue values returned by successive `next_unit` calls.
    #[must_use]
    pub fn with_units<I: IntoIterator<Item = f64>>(self, units: I) -> Self {
        self.units
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(units);
        self
    }

    /// Queue values returned by successive `next_below` calls.
    #[must_use]
    pub fn with_belows<I: IntoIterator<Item = u64>>(self, belows: I) -> Self {
        self.belows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(belows);
        self
    }
}

impl RandomSource for StepRandom {
    fn next_unit(&self) -> f64 {
        self.units
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or(1.0)
    }

    fn next_below(&self, upper: u64) -> u64 {
        let value = self
            .belows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or(0);
        if upper == 0 { 0 } else { value.min(upper - 1) }
    }
}
