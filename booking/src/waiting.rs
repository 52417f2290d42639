//! Waiting-room contention simulator
//!
//! A run is a ten-second countdown during which competing buyers claim the
//! user's selected seats. Four periodic timers drive it: the countdown
//! itself, waiting-room decay, per-seat attrition, and a status message
//! toggle. The countdown reaching zero resolves the run exactly once, to
//! either `Succeeded` (some seats survived) or `Fallback` (all taken), and
//! cancels every timer so nothing mutates state after resolution.

use seatrush_core::effect::{Effect, TimerId};
use seatrush_core::reducer::{Effects, Reducer};
use smallvec::smallvec;

use crate::config::{
    ATTRITION_PERIOD, COUNTDOWN_PERIOD, COUNTDOWN_START_SECS, DECAY_FLOOR, DECAY_PERIOD,
    INITIAL_WAITING_ROOM, MAX_SELECTION, MESSAGE_PERIOD, TAKEOVER_PROBABILITY,
};
use crate::env::BookingEnvironment;
use crate::flow::{AppAction, AppState, ContentionOutcome, FlowAction};
use crate::state::{BookingAction, BookingReducer};
use crate::types::{Seat, SeatStatus};

/// Countdown tick, once per second.
pub const COUNTDOWN_TIMER: TimerId = TimerId("waiting.countdown");
/// Waiting-room decay tick.
pub const DECAY_TIMER: TimerId = TimerId("waiting.decay");
/// Seat attrition tick.
pub const ATTRITION_TIMER: TimerId = TimerId("waiting.attrition");
/// Status message rotation tick.
pub const MESSAGE_TIMER: TimerId = TimerId("waiting.message");

/// Phase of the waiting-room state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitingPhase {
    /// No run in progress.
    #[default]
    Idle,
    /// Countdown running, timers live.
    Running,
    /// Resolved: at least one seat survived.
    Succeeded,
    /// Resolved: every seat was taken.
    Fallback,
}

impl WaitingPhase {
    /// Whether the run has reached a terminal phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Fallback)
    }
}

/// State of one waiting-room run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingState {
    /// Current phase.
    pub phase: WaitingPhase,
    /// Seconds left on the countdown.
    pub time_left: u32,
    /// Displayed number of people still ahead in the queue.
    pub waiting_room: u64,
    /// Which of the two rotating status lines is showing.
    pub show_waiting_count: bool,
}

/// Actions handled by [`WaitingReducer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitingAction {
    /// Start a run over the current selection.
    Enter,
    /// One second elapsed.
    CountdownTick,
    /// Waiting-room decay tick.
    DecayTick,
    /// Seat attrition tick.
    AttritionTick,
    /// Rotate the status message.
    ToggleMessage,
    /// Abandon the run (user navigated away).
    Leave,
}

/// The rotating status line shown during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitingMessage {
    /// "N people ahead of you".
    WaitingCount(u64),
    /// Every selected seat has been taken.
    AllTaken,
    /// Some seats lost, some still held.
    PartialAttrition,
    /// Generic waiting line.
    Waiting,
}

impl std::fmt::Display for WaitingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingCount(count) => write!(f, "{count} people ahead of you"),
            Self::AllTaken => f.write_str("all of your seats were taken by other buyers"),
            Self::PartialAttrition => f.write_str("some of your seats were taken by other buyers"),
            Self::Waiting => f.write_str("securing your seats..."),
        }
    }
}

/// Status line for the current instant, derived from state.
///
/// The message alternates on the toggle timer between the waiting-room count
/// and a seat-status line, so two renders of the same state always agree.
#[must_use]
pub fn status_message(state: &AppState) -> WaitingMessage {
    if state.waiting.show_waiting_count {
        return WaitingMessage::WaitingCount(state.waiting.waiting_room);
    }

    if state.booking.all_selected_taken() {
        WaitingMessage::AllTaken
    } else if state.booking.selection.iter().any(Seat::is_taken) {
        WaitingMessage::PartialAttrition
    } else {
        WaitingMessage::Waiting
    }
}

/// Reducer driving the waiting-room run.
///
/// Operates on the whole [`AppState`]: the countdown needs the selection to
/// resolve, and attrition flips seats through [`BookingReducer`] so the
/// selection invariants hold under contention too.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitingReducer;

impl WaitingReducer {
    fn enter(state: &mut AppState) -> Effects<AppAction> {
        if state.waiting.phase == WaitingPhase::Running {
            tracing::warn!("waiting-room entry ignored: run already in progress");
            return smallvec![Effect::None];
        }

        let selected = state.booking.selection.len();
        if selected == 0 || selected > MAX_SELECTION {
            tracing::warn!(selected, "waiting-room entry refused: invalid selection");
            return smallvec![Effect::None];
        }

        state.waiting = WaitingState {
            phase: WaitingPhase::Running,
            time_left: COUNTDOWN_START_SECS,
            waiting_room: INITIAL_WAITING_ROOM,
            show_waiting_count: true,
        };

        tracing::info!(selected, "waiting-room run started");

        smallvec![
            Effect::Every {
                id: COUNTDOWN_TIMER,
                period: COUNTDOWN_PERIOD,
                action: Box::new(AppAction::Waiting(WaitingAction::CountdownTick)),
            },
            Effect::Every {
                id: DECAY_TIMER,
                period: DECAY_PERIOD,
                action: Box::new(AppAction::Waiting(WaitingAction::DecayTick)),
            },
            Effect::Every {
                id: ATTRITION_TIMER,
                period: ATTRITION_PERIOD,
                action: Box::new(AppAction::Waiting(WaitingAction::AttritionTick)),
            },
            Effect::Every {
                id: MESSAGE_TIMER,
                period: MESSAGE_PERIOD,
                action: Box::new(AppAction::Waiting(WaitingAction::ToggleMessage)),
            },
        ]
    }

    fn cancel_run_timers() -> [Effect<AppAction>; 4] {
        [
            Effect::Cancel(COUNTDOWN_TIMER),
            Effect::Cancel(DECAY_TIMER),
            Effect::Cancel(ATTRITION_TIMER),
            Effect::Cancel(MESSAGE_TIMER),
        ]
    }

    fn countdown_tick(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        if state.waiting.phase != WaitingPhase::Running {
            return smallvec![Effect::None];
        }

        state.waiting.time_left = state.waiting.time_left.saturating_sub(1);
        if state.waiting.time_left > 0 {
            return smallvec![Effect::None];
        }

        // Terminal transition. The phase flip below is the resolve-once
        // guard: any tick arriving after it hits the Running check above.
        let survivors = state.booking.live_selection();
        let outcome = if survivors.is_empty() {
            state.waiting.phase = WaitingPhase::Fallback;
            tracing::info!("contention resolved: all seats taken, entering fallback");
            ContentionOutcome::Fallback
        } else {
            let _ = BookingReducer.reduce(
                &mut state.booking,
                BookingAction::SetSelection(survivors.clone()),
                env,
            );
            state.waiting.phase = WaitingPhase::Succeeded;
            tracing::info!(survivors = survivors.len(), "contention resolved: succeeded");
            ContentionOutcome::Booked { seats: survivors }
        };

        let mut effects: Effects<AppAction> = Self::cancel_run_timers().into_iter().collect();
        effects.push(Effect::Future(Box::pin(async move {
            Some(AppAction::Flow(FlowAction::ContentionResolved(outcome)))
        })));
        effects
    }

    fn decay_tick(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        if state.waiting.phase != WaitingPhase::Running {
            return smallvec![Effect::None];
        }

        let decrease = env.rng.next_below(INITIAL_WAITING_ROOM / 10) + DECAY_FLOOR;
        state.waiting.waiting_room = state.waiting.waiting_room.saturating_sub(decrease);
        smallvec![Effect::None]
    }

    fn attrition_tick(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        if state.waiting.phase != WaitingPhase::Running {
            return smallvec![Effect::None];
        }

        // Draw in selection order so a scripted source maps draws to seats.
        let live: Vec<_> = state
            .booking
            .selection
            .iter()
            .filter(|seat| !seat.is_taken())
            .map(|seat| seat.id.clone())
            .collect();

        for id in live {
            if env.rng.next_unit() < TAKEOVER_PROBABILITY {
                tracing::debug!(seat = %id, "seat taken by a competing buyer");
                let _ = BookingReducer.reduce(
                    &mut state.booking,
                    BookingAction::UpdateSeatStatus {
                        seat: id,
                        status: SeatStatus::Taken,
                    },
                    env,
                );
            }
        }

        smallvec![Effect::None]
    }

    fn leave(state: &mut AppState) -> Effects<AppAction> {
        if state.waiting.phase != WaitingPhase::Running {
            return smallvec![Effect::None];
        }

        state.waiting.phase = WaitingPhase::Idle;
        tracing::info!("waiting-room run abandoned");
        Self::cancel_run_timers().into_iter().collect()
    }
}

impl Reducer for WaitingReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        let AppAction::Waiting(action) = action else {
            return smallvec![Effect::None];
        };

        match action {
            WaitingAction::Enter => Self::enter(state),
            WaitingAction::CountdownTick => Self::countdown_tick(state, env),
            WaitingAction::DecayTick => Self::decay_tick(state, env),
            WaitingAction::AttritionTick => Self::attrition_tick(state, env),
            WaitingAction::ToggleMessage => {
                if state.waiting.phase == WaitingPhase::Running {
                    state.waiting.show_waiting_count = !state.waiting.show_waiting_count;
                }
                smallvec![Effect::None]
            },
            WaitingAction::Leave => Self::leave(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatrush_testing::ReducerTest;
    use seatrush_testing::assertions;
    use seatrush_testing::mocks::{FixedClock, SeededRandom, StepRandom};
    use std::sync::Arc;

    use crate::inventory::MockInventoryProvider;
    use crate::types::{SeatId, SectionId};

    fn env_with_rng(rng: Arc<dyn seatrush_core::environment::RandomSource>) -> BookingEnvironment {
        BookingEnvironment::new(
            Arc::new(FixedClock::default_instant()),
            rng,
            Arc::new(MockInventoryProvider::new()),
        )
    }

    fn test_env() -> BookingEnvironment {
        env_with_rng(Arc::new(SeededRandom::new(7)))
    }

    fn seat_id(index: u16) -> SeatId {
        SeatId::new(SectionId::from("FLOOR-A"), index)
    }

    fn running_state(selection: Vec<Seat>, time_left: u32) -> AppState {
        let mut state = AppState::default();
        state.booking.selection = selection;
        state.waiting = WaitingState {
            phase: WaitingPhase::Running,
            time_left,
            waiting_room: INITIAL_WAITING_ROOM,
            show_waiting_count: true,
        };
        state
    }

    #[test]
    fn enter_starts_all_four_timers() {
        let mut state = AppState::default();
        state.booking.selection = vec![Seat::selected(seat_id(0))];

        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(AppAction::Waiting(WaitingAction::Enter))
            .then_state(|state| {
                assert_eq!(state.waiting.phase, WaitingPhase::Running);
                assert_eq!(state.waiting.time_left, COUNTDOWN_START_SECS);
                assert_eq!(state.waiting.waiting_room, INITIAL_WAITING_ROOM);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 4);
                assertions::assert_starts_timer(effects, COUNTDOWN_TIMER);
                assertions::assert_starts_timer(effects, DECAY_TIMER);
                assertions::assert_starts_timer(effects, ATTRITION_TIMER);
                assertions::assert_starts_timer(effects, MESSAGE_TIMER);
            })
            .run();
    }

    #[test]
    fn enter_with_empty_selection_is_refused() {
        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(AppState::default())
            .when_action(AppAction::Waiting(WaitingAction::Enter))
            .then_state(|state| assert_eq!(state.waiting.phase, WaitingPhase::Idle))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn reentry_during_run_is_ignored() {
        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(running_state(vec![Seat::selected(seat_id(0))], 5))
            .when_action(AppAction::Waiting(WaitingAction::Enter))
            .then_state(|state| {
                // An accepted entry would reset the countdown to the start
                assert_eq!(state.waiting.time_left, 5);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn countdown_resolves_success_with_survivors() {
        let mut taken = Seat::selected(seat_id(0));
        taken.status = SeatStatus::Taken;
        let survivor = Seat::selected(seat_id(1));

        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(running_state(vec![taken, survivor.clone()], 1))
            .when_action(AppAction::Waiting(WaitingAction::CountdownTick))
            .then_state(move |state| {
                assert_eq!(state.waiting.phase, WaitingPhase::Succeeded);
                assert_eq!(state.booking.selection, vec![survivor.clone()]);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 5);
                assertions::assert_cancels_timer(effects, COUNTDOWN_TIMER);
                assertions::assert_cancels_timer(effects, DECAY_TIMER);
                assertions::assert_cancels_timer(effects, ATTRITION_TIMER);
                assertions::assert_cancels_timer(effects, MESSAGE_TIMER);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn countdown_resolves_fallback_when_all_taken() {
        let mut seat = Seat::selected(seat_id(0));
        seat.status = SeatStatus::Taken;

        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(running_state(vec![seat], 1))
            .when_action(AppAction::Waiting(WaitingAction::CountdownTick))
            .then_state(|state| {
                assert_eq!(state.waiting.phase, WaitingPhase::Fallback);
            })
            .then_effects(|effects| {
                assertions::assert_cancels_timer(effects, COUNTDOWN_TIMER);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn resolution_happens_exactly_once() {
        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(running_state(vec![Seat::selected(seat_id(0))], 1))
            .when_action(AppAction::Waiting(WaitingAction::CountdownTick))
            .when_action(AppAction::Waiting(WaitingAction::CountdownTick))
            .then_state(|state| {
                assert_eq!(state.waiting.phase, WaitingPhase::Succeeded);
                assert_eq!(state.booking.selection.len(), 1);
            })
            .then_effects(|effects| {
                // Second tick lands after resolution and must do nothing
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn all_taken_mid_run_does_not_resolve_early() {
        let mut seat = Seat::selected(seat_id(0));
        seat.status = SeatStatus::Taken;

        ReducerTest::new(WaitingReducer)
            .with_env(test_env())
            .given_state(running_state(vec![seat], 5))
            .when_action(AppAction::Waiting(WaitingAction::CountdownTick))
            .then_state(|state| {
                assert_eq!(state.waiting.phase, WaitingPhase::Running);
                assert_eq!(state.waiting.time_left, 4);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn attrition_flips_scripted_seats() {
        // First draw flips seat 0; second keeps seat 1
        let rng = StepRandom::new().with_units([0.01, 0.9]);
        let env = env_with_rng(Arc::new(rng));

        let mut state = running_state(
            vec![Seat::selected(seat_id(0)), Seat::selected(seat_id(1))],
            5,
        );
        let _ = WaitingReducer.reduce(
            &mut state,
            AppAction::Waiting(WaitingAction::AttritionTick),
            &env,
        );

        assert!(state.booking.selection[0].is_taken());
        assert!(!state.booking.selection[1].is_taken());
        // Taken seats stay in the selection during the run
        assert_eq!(state.booking.selection.len(), 2);
    }

    #[test]
    fn attrition_skips_already_taken_seats() {
        let rng = StepRandom::new().with_units([0.01]);
        let env = env_with_rng(Arc::new(rng));

        let mut taken = Seat::selected(seat_id(0));
        taken.status = SeatStatus::Taken;
        let mut state = running_state(vec![taken, Seat::selected(seat_id(1))], 5);

        let _ = WaitingReducer.reduce(
            &mut state,
            AppAction::Waiting(WaitingAction::AttritionTick),
            &env,
        );

        // The single scripted draw applies to the live seat, not the dead one
        assert!(state.booking.selection[1].is_taken());
    }

    #[test]
    fn decay_decreases_waiting_room_with_floor() {
        let rng = StepRandom::new().with_belows([25]);
        let env = env_with_rng(Arc::new(rng));

        let mut state = running_state(vec![Seat::selected(seat_id(0))], 5);
        let _ = WaitingReducer.reduce(
            &mut state,
            AppAction::Waiting(WaitingAction::DecayTick),
            &env,
        );

        assert_eq!(
            state.waiting.waiting_room,
            INITIAL_WAITING_ROOM - 25 - DECAY_FLOOR
        );
    }

    #[test]
    fn ticks_after_leave_are_noops() {
        let env = test_env();
        let mut state = running_state(vec![Seat::selected(seat_id(0))], 5);

        let effects =
            WaitingReducer.reduce(&mut state, AppAction::Waiting(WaitingAction::Leave), &env);
        assert!(effects.iter().any(|e| e.cancels_timer(COUNTDOWN_TIMER)));
        assert_eq!(state.waiting.phase, WaitingPhase::Idle);

        let before = state.clone();
        let _ = WaitingReducer.reduce(
            &mut state,
            AppAction::Waiting(WaitingAction::CountdownTick),
            &env,
        );
        let _ = WaitingReducer.reduce(
            &mut state,
            AppAction::Waiting(WaitingAction::AttritionTick),
            &env,
        );
        assert_eq!(state, before);
    }

    #[test]
    fn status_message_follows_toggle_and_seat_state() {
        let mut state = running_state(vec![Seat::selected(seat_id(0))], 5);
        assert_eq!(
            status_message(&state),
            WaitingMessage::WaitingCount(INITIAL_WAITING_ROOM)
        );

        state.waiting.show_waiting_count = false;
        assert_eq!(status_message(&state), WaitingMessage::Waiting);

        state.booking.selection.push(Seat {
            id: seat_id(1),
            status: SeatStatus::Taken,
        });
        assert_eq!(status_message(&state), WaitingMessage::PartialAttrition);

        for seat in &mut state.booking.selection {
            seat.status = SeatStatus::Taken;
        }
        assert_eq!(status_message(&state), WaitingMessage::AllTaken);
    }
}
