//! Tunables for the contention simulation and venue layout
//!
//! These values define the shape of a waiting-room run. They are constants
//! rather than configuration because the product tunes them as a unit: the
//! countdown length, tick rates, and attrition probability together decide
//! how often a run ends in success versus fallback.

use std::time::Duration;

/// Seats per row when deriving row/number from a seat index.
pub const ROW_WIDTH: u16 = 16;

/// Seats per section in the mock inventory.
pub const SECTION_CAPACITY: u16 = 160;

/// Maximum number of seats in one selection.
pub const MAX_SELECTION: usize = 3;

/// Price of a single seat, in won.
pub const SEAT_PRICE_WON: u64 = 150_000;

/// Waiting-room countdown start, in whole seconds.
pub const COUNTDOWN_START_SECS: u32 = 10;

/// Displayed waiting-room size at the start of a run.
pub const INITIAL_WAITING_ROOM: u64 = 12_340;

/// Per-tick probability that a still-live selected seat is taken.
pub const TAKEOVER_PROBABILITY: f64 = 0.05;

/// Countdown tick period.
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Waiting-room decay tick period.
pub const DECAY_PERIOD: Duration = Duration::from_millis(1500);

/// Seat attrition tick period during the countdown.
pub const ATTRITION_PERIOD: Duration = Duration::from_secs(1);

/// Status message rotation period.
pub const MESSAGE_PERIOD: Duration = Duration::from_secs(3);

/// Guaranteed minimum drop of the waiting-room count per decay tick.
pub const DECAY_FLOOR: u64 = 10;

/// Attrition tick period on the manual fallback page.
pub const FALLBACK_ATTRITION_PERIOD: Duration = Duration::from_millis(50);

/// Most seats a single fallback attrition tick can claim.
pub const FALLBACK_ATTRITION_MAX_TAKE: u64 = 3;
