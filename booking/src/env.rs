//! Booking environment: injected dependencies for the reducers
//!
//! Reducers stay pure by taking time, randomness, and inventory access as
//! trait objects. Swapping these for the deterministic test doubles is what
//! makes a full contention run replayable.

use rand::Rng;
use seatrush_core::environment::{Clock, RandomSource, SystemClock};
use seatrush_runtime::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

use crate::inventory::{MockInventoryProvider, SeatInventoryProvider};

/// Random source drawing from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }

    fn next_below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Shared environment handed to every reducer.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Wall-clock source for booking timestamps.
    pub clock: Arc<dyn Clock>,
    /// Randomness for attrition and decay draws.
    pub rng: Arc<dyn RandomSource>,
    /// Seat inventory source.
    pub inventory: Arc<dyn SeatInventoryProvider>,
    /// Retry policy for inventory fetches.
    pub retry: RetryPolicy,
}

impl BookingEnvironment {
    /// Build an environment from explicit dependencies.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
        inventory: Arc<dyn SeatInventoryProvider>,
    ) -> Self {
        Self {
            clock,
            rng,
            inventory,
            retry: RetryPolicy::new()
                .with_max_attempts(3)
                .with_initial_delay(Duration::from_millis(100)),
        }
    }

    /// Production wiring: system clock, thread-local randomness, mock venue.
    #[must_use]
    pub fn production() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(ThreadRandom),
            Arc::new(MockInventoryProvider::new()),
        )
    }

    /// Override the retry policy for inventory fetches.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_bounds() {
        let rng = ThreadRandom;
        for _ in 0..64 {
            let unit = rng.next_unit();
            assert!((0.0..1.0).contains(&unit));
            assert!(rng.next_below(7) < 7);
        }
        assert_eq!(rng.next_below(0), 0);
    }
}
