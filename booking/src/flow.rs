//! Flow orchestration and app-level composition
//!
//! [`AppReducer`] is the single reducer installed in the store. It scopes
//! each action to the feature reducer that owns it, so every mutation
//! (user intent or timer tick alike) commits atomically under one write
//! lock. [`FlowReducer`] owns navigation: it gates entry into the
//! waiting room, consumes the contention simulator's terminal signal, and
//! tears down background loops when the user navigates away.

use seatrush_core::effect::Effect;
use seatrush_core::reducer::{Effects, Reducer};
use smallvec::smallvec;

use crate::config::MAX_SELECTION;
use crate::env::BookingEnvironment;
use crate::fallback::{FALLBACK_ATTRITION_TIMER, FallbackAction, FallbackReducer, FallbackState};
use crate::state::{BookingAction, BookingReducer, BookingState, SelectionRejection};
use crate::types::Seat;
use crate::waiting::{WaitingAction, WaitingPhase, WaitingReducer, WaitingState};

/// Pages of the booking flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Route {
    /// Concert landing page.
    #[default]
    Home,
    /// Show date and time selection.
    Calendar,
    /// Venue viewer for section selection.
    Section,
    /// Seat map for the chosen section.
    Seat,
    /// Attendee details.
    Info,
    /// Payment method and confirmation.
    Payment,
    /// Waiting-room contention run.
    Waiting,
    /// Manual fallback seat page.
    ManualSeat,
    /// Booking confirmed.
    Success,
    /// Past bookings.
    History,
}

/// How a waiting-room run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentionOutcome {
    /// At least one seat survived; the booking proceeds with them.
    Booked {
        /// The surviving seats.
        seats: Vec<Seat>,
    },
    /// Every seat was taken; the user moves to manual fallback.
    Fallback,
}

/// Actions handled by [`FlowReducer`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlowAction {
    /// Move to another page.
    Navigate(Route),
    /// Terminal signal of a waiting-room run. Emitted exactly once per run.
    ContentionResolved(ContentionOutcome),
}

/// Top-level action space.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Seat and selection mutations.
    Booking(BookingAction),
    /// Waiting-room run.
    Waiting(WaitingAction),
    /// Manual fallback page.
    Fallback(FallbackAction),
    /// Navigation and terminal signals.
    Flow(FlowAction),
}

/// Top-level application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Seat and selection state.
    pub booking: BookingState,
    /// Waiting-room run state.
    pub waiting: WaitingState,
    /// Manual fallback page state.
    pub fallback: FallbackState,
    /// Current page.
    pub route: Route,
}

/// Navigation and terminal-signal reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowReducer;

impl FlowReducer {
    fn navigate(state: &mut AppState, destination: Route) -> Effects<AppAction> {
        if destination == Route::Waiting {
            let selected = state.booking.selection.len();
            if selected == 0 {
                tracing::warn!("waiting room refused: empty selection");
                state.booking.last_rejection = Some(SelectionRejection::EmptySelection);
                return smallvec![Effect::None];
            }
            if selected > MAX_SELECTION {
                tracing::warn!(selected, "waiting room refused: selection over the limit");
                state.booking.last_rejection = Some(SelectionRejection::SelectionLimit);
                return smallvec![Effect::None];
            }
        }

        let mut effects: Effects<AppAction> = smallvec![];

        // Leaving a page with a live background loop tears the loop down
        if state.route == Route::Waiting
            && destination != Route::Waiting
            && state.waiting.phase == WaitingPhase::Running
        {
            effects.push(Effect::Future(Box::pin(async {
                Some(AppAction::Waiting(WaitingAction::Leave))
            })));
        }
        if state.route == Route::ManualSeat
            && destination != Route::ManualSeat
            && state.fallback.active
        {
            state.fallback.active = false;
            effects.push(Effect::Cancel(FALLBACK_ATTRITION_TIMER));
        }

        tracing::info!(from = ?state.route, to = ?destination, "navigating");
        state.route = destination;

        if destination == Route::Waiting {
            effects.push(Effect::Future(Box::pin(async {
                Some(AppAction::Waiting(WaitingAction::Enter))
            })));
        }

        if effects.is_empty() {
            effects.push(Effect::None);
        }
        effects
    }

    fn contention_resolved(
        state: &mut AppState,
        outcome: &ContentionOutcome,
    ) -> Effects<AppAction> {
        match outcome {
            ContentionOutcome::Booked { seats } => {
                tracing::info!(seats = seats.len(), "waiting room succeeded");
                state.route = Route::Success;
                // Mint the ticket from the surviving selection
                smallvec![Effect::Future(Box::pin(async {
                    Some(AppAction::Booking(BookingAction::CompleteBooking))
                }))]
            },
            ContentionOutcome::Fallback => {
                tracing::info!("waiting room failed, moving to manual fallback");
                state.route = Route::ManualSeat;
                smallvec![Effect::Future(Box::pin(async {
                    Some(AppAction::Fallback(FallbackAction::Enter))
                }))]
            },
        }
    }
}

impl Reducer for FlowReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> Effects<Self::Action> {
        let AppAction::Flow(action) = action else {
            return smallvec![Effect::None];
        };

        match action {
            FlowAction::Navigate(destination) => Self::navigate(state, destination),
            FlowAction::ContentionResolved(outcome) => {
                Self::contention_resolved(state, &outcome)
            },
        }
    }
}

/// The one reducer installed in the store.
///
/// Dispatches each action to the feature reducer that owns it and lifts the
/// child's effects back into the app action space.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppReducer {
    booking: BookingReducer,
    waiting: WaitingReducer,
    fallback: FallbackReducer,
    flow: FlowReducer,
}

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            AppAction::Booking(action) => self
                .booking
                .reduce(&mut state.booking, action, env)
                .into_iter()
                .map(|effect| effect.map(AppAction::Booking))
                .collect(),
            AppAction::Waiting(_) => self.waiting.reduce(state, action, env),
            AppAction::Fallback(_) => self.fallback.reduce(state, action, env),
            AppAction::Flow(_) => self.flow.reduce(state, action, env),
        }
    }
}
