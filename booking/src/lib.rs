//! # Seatrush Booking
//!
//! Concert ticket booking engine built on the seatrush store runtime.
//!
//! The flow runs from date selection through seat selection into the
//! waiting room, where a timed contention run decides whether the user's
//! seats survive competing buyers. Survivors go straight to confirmation;
//! a wipe-out drops the user onto a manual fallback page where seats keep
//! disappearing every 50ms until they grab replacements or give up.
//!
//! Module map:
//!
//! - [`types`] / [`config`]: venue and seat model, simulation tunables
//! - [`state`]: [`state::BookingReducer`], the single owner of seat and
//!   selection mutation
//! - [`waiting`]: the countdown contention run and its four timers
//! - [`fallback`]: the manual fallback allocator
//! - [`flow`]: navigation, terminal signals, and [`flow::AppReducer`]
//! - [`inventory`]: the seat inventory provider trait and its mock
//! - [`viewer`]: the bridge to the out-of-process venue viewer
//! - [`env`]: injected clock, randomness, and inventory dependencies

pub mod config;
pub mod env;
pub mod fallback;
pub mod flow;
pub mod inventory;
pub mod state;
pub mod types;
pub mod viewer;
pub mod waiting;

pub use env::BookingEnvironment;
pub use flow::{AppAction, AppReducer, AppState, ContentionOutcome, FlowAction, Route};
pub use state::{BookingAction, BookingReducer, BookingState, SelectionRejection};
pub use viewer::AppStore;
