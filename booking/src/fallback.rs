//! Manual fallback allocator
//!
//! When a waiting-room run ends with every seat taken, the user lands on a
//! manual seat page where contention keeps running: every 50ms a few more
//! seats disappear. The page starts from a clean slate (the failed
//! selection must not resurface), fetches inventory lazily per section,
//! and prunes the selection whenever a held seat is claimed.

use seatrush_core::effect::{Effect, TimerId};
use seatrush_core::reducer::{Effects, Reducer};
use seatrush_runtime::retry_with_policy;
use smallvec::smallvec;
use std::sync::Arc;

use crate::config::{FALLBACK_ATTRITION_MAX_TAKE, FALLBACK_ATTRITION_PERIOD};
use crate::env::BookingEnvironment;
use crate::flow::{AppAction, AppState, FlowAction, Route};
use crate::state::{BookingAction, BookingReducer, SelectionRejection};
use crate::types::{Seat, SeatId, SeatStatus, SectionId};

/// Fallback-page attrition tick, every 50ms.
pub const FALLBACK_ATTRITION_TIMER: TimerId = TimerId("fallback.attrition");

/// What a failed inventory fetch was trying to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    /// The list of sections on sale.
    Sections,
    /// The seat map of one section.
    Seats(SectionId),
}

/// State of the manual fallback page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackState {
    /// Whether the page (and its attrition loop) is active.
    pub active: bool,
    /// Whether an inventory fetch is in flight.
    pub loading: bool,
    /// Sections on sale, in display order.
    pub available_sections: Vec<SectionId>,
    /// Whether the exit confirmation prompt is showing.
    pub exit_prompt: bool,
    /// Last inventory fetch failure, if any.
    pub fetch_error: Option<String>,
}

/// Actions handled by [`FallbackReducer`].
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackAction {
    /// Enter the page after a failed waiting-room run.
    Enter,
    /// Section list arrived.
    SectionsLoaded(Vec<SectionId>),
    /// A section's seat map arrived.
    SeatsLoaded {
        /// Which section.
        section: SectionId,
        /// Its seats.
        seats: Vec<Seat>,
    },
    /// An inventory fetch failed after retries.
    FetchFailed {
        /// What the fetch was loading.
        what: FetchKind,
        /// Provider error message.
        error: String,
    },
    /// Retry the failed fetch.
    RetryFetch,
    /// Attrition tick: competitors claim more seats.
    AttritionTick,
    /// Toggle a seat in the selection.
    SelectSeat(SeatId),
    /// Switch to another section's seat map.
    ChangeSection(SectionId),
    /// Confirm the selection and move on to payment or success.
    ConfirmSelection,
    /// The user asked to leave; show the confirmation prompt.
    RequestExit,
    /// Dismiss the exit prompt and keep hunting for seats.
    StayWaiting,
    /// Leave for good: tear down and go home.
    AbandonBooking,
}

/// Reducer driving the manual fallback page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackReducer;

impl FallbackReducer {
    fn fetch_sections_effect(env: &BookingEnvironment) -> Effect<AppAction> {
        let provider = Arc::clone(&env.inventory);
        let retry = env.retry.clone();
        Effect::Future(Box::pin(async move {
            let result = retry_with_policy(&retry, "fetch_available_sections", || {
                let provider = Arc::clone(&provider);
                async move { provider.fetch_available_sections().await }
            })
            .await;

            let action = match result {
                Ok(sections) => FallbackAction::SectionsLoaded(sections),
                Err(error) => FallbackAction::FetchFailed {
                    what: FetchKind::Sections,
                    error: error.to_string(),
                },
            };
            Some(AppAction::Fallback(action))
        }))
    }

    fn fetch_seats_effect(env: &BookingEnvironment, section: SectionId) -> Effect<AppAction> {
        let provider = Arc::clone(&env.inventory);
        let retry = env.retry.clone();
        Effect::Future(Box::pin(async move {
            let result = retry_with_policy(&retry, "fetch_section_seats", || {
                let provider = Arc::clone(&provider);
                let section = section.clone();
                async move { provider.fetch_section_seats(&section).await }
            })
            .await;

            let action = match result {
                Ok(seats) => FallbackAction::SeatsLoaded { section, seats },
                Err(error) => FallbackAction::FetchFailed {
                    what: FetchKind::Seats(section),
                    error: error.to_string(),
                },
            };
            Some(AppAction::Fallback(action))
        }))
    }

    fn enter(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        // Clean slate; the section on screen survives the reset so the user
        // lands where they were looking.
        let previous_section = state.booking.current_section.take();
        let _ = BookingReducer.reduce(&mut state.booking, BookingAction::ResetBooking, env);
        state.booking.current_section = previous_section;

        state.fallback = FallbackState {
            active: true,
            loading: true,
            ..FallbackState::default()
        };

        tracing::info!("manual fallback page entered");

        smallvec![
            Self::fetch_sections_effect(env),
            Effect::Every {
                id: FALLBACK_ATTRITION_TIMER,
                period: FALLBACK_ATTRITION_PERIOD,
                action: Box::new(AppAction::Fallback(FallbackAction::AttritionTick)),
            },
        ]
    }

    fn sections_loaded(
        state: &mut AppState,
        env: &BookingEnvironment,
        sections: Vec<SectionId>,
    ) -> Effects<AppAction> {
        state.fallback.available_sections = sections;
        state.fallback.fetch_error = None;

        let current_is_on_sale = state
            .booking
            .current_section
            .as_ref()
            .is_some_and(|section| state.fallback.available_sections.contains(section));
        if !current_is_on_sale {
            state.booking.current_section = state.fallback.available_sections.first().cloned();
        }

        match state.booking.current_section.clone() {
            Some(section) if !state.booking.section_seats.contains_key(&section) => {
                state.fallback.loading = true;
                smallvec![Self::fetch_seats_effect(env, section)]
            },
            Some(_) => {
                state.fallback.loading = false;
                smallvec![Effect::None]
            },
            None => {
                tracing::warn!("no sections on sale");
                state.fallback.loading = false;
                smallvec![Effect::None]
            },
        }
    }

    // Pool indices fit in usize; the draw is bounded by pool.len()
    #[allow(clippy::cast_possible_truncation)]
    fn attrition_tick(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        if !state.fallback.active {
            return smallvec![Effect::None];
        }
        let Some(section) = state.booking.current_section.clone() else {
            return smallvec![Effect::None];
        };
        let Some(seats) = state.booking.section_seats.get(&section) else {
            return smallvec![Effect::None];
        };

        let mut pool: Vec<SeatId> = seats
            .iter()
            .filter(|seat| seat.is_available())
            .map(|seat| seat.id.clone())
            .collect();

        // A fully-taken section is a valid, non-terminal state; the user may
        // switch sections or leave, but the loop never ends the flow.
        if pool.is_empty() {
            return smallvec![Effect::None];
        }

        let take = (env.rng.next_below(FALLBACK_ATTRITION_MAX_TAKE) + 1).min(pool.len() as u64);
        for _ in 0..take {
            let index = env.rng.next_below(pool.len() as u64) as usize;
            let victim = pool.swap_remove(index);
            let _ = BookingReducer.reduce(
                &mut state.booking,
                BookingAction::UpdateSeatStatus {
                    seat: victim,
                    status: SeatStatus::Taken,
                },
                env,
            );
        }

        // Unlike the waiting room, a claimed seat leaves the selection here
        state.booking.selection.retain(|seat| !seat.is_taken());

        smallvec![Effect::None]
    }

    fn confirm_selection(state: &mut AppState) -> Effects<AppAction> {
        if state.booking.selection.is_empty() {
            state.booking.last_rejection = Some(SelectionRejection::EmptySelection);
            return smallvec![Effect::None];
        }

        state.fallback.active = false;

        let destination = if state.booking.prepaid {
            Route::Success
        } else {
            Route::Payment
        };
        tracing::info!(
            seats = state.booking.selection.len(),
            prepaid = state.booking.prepaid,
            "fallback selection confirmed"
        );

        let mut effects: Effects<AppAction> =
            smallvec![Effect::Cancel(FALLBACK_ATTRITION_TIMER)];
        if destination == Route::Success {
            // Prepaid: mint the ticket, then land on the success page
            effects.push(Effect::Sequential(vec![
                Effect::Future(Box::pin(async {
                    Some(AppAction::Booking(BookingAction::CompleteBooking))
                })),
                Effect::Future(Box::pin(async {
                    Some(AppAction::Flow(FlowAction::Navigate(Route::Success)))
                })),
            ]));
        } else {
            effects.push(Effect::Future(Box::pin(async {
                Some(AppAction::Flow(FlowAction::Navigate(Route::Payment)))
            })));
        }
        effects
    }

    fn abandon(state: &mut AppState, env: &BookingEnvironment) -> Effects<AppAction> {
        state.fallback = FallbackState::default();
        let _ = BookingReducer.reduce(&mut state.booking, BookingAction::ResetBooking, env);
        tracing::info!("fallback abandoned");

        smallvec![
            Effect::Cancel(FALLBACK_ATTRITION_TIMER),
            Effect::Future(Box::pin(async {
                Some(AppAction::Flow(FlowAction::Navigate(Route::Home)))
            })),
        ]
    }
}

impl Reducer for FallbackReducer {
    type State = AppState;
    type Action = AppAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        let AppAction::Fallback(action) = action else {
            return smallvec![Effect::None];
        };

        match action {
            FallbackAction::Enter => Self::enter(state, env),
            FallbackAction::SectionsLoaded(sections) => Self::sections_loaded(state, env, sections),
            FallbackAction::SeatsLoaded { section, seats } => {
                let _ = BookingReducer.reduce(
                    &mut state.booking,
                    BookingAction::SetSectionInventory { section, seats },
                    env,
                );
                state.fallback.loading = false;
                state.fallback.fetch_error = None;
                smallvec![Effect::None]
            },
            FallbackAction::FetchFailed { what, error } => {
                tracing::error!(?what, error, "inventory fetch failed");
                state.fallback.loading = false;
                state.fallback.fetch_error = Some(error);
                smallvec![Effect::None]
            },
            FallbackAction::RetryFetch => {
                state.fallback.fetch_error = None;
                if state.fallback.available_sections.is_empty() {
                    state.fallback.loading = true;
                    return smallvec![Self::fetch_sections_effect(env)];
                }
                match state.booking.current_section.clone() {
                    Some(section) if !state.booking.section_seats.contains_key(&section) => {
                        state.fallback.loading = true;
                        smallvec![Self::fetch_seats_effect(env, section)]
                    },
                    _ => smallvec![Effect::None],
                }
            },
            FallbackAction::AttritionTick => Self::attrition_tick(state, env),
            FallbackAction::SelectSeat(id) => {
                let _ = BookingReducer.reduce(&mut state.booking, BookingAction::SelectSeat(id), env);
                smallvec![Effect::None]
            },
            FallbackAction::ChangeSection(section) => {
                let _ = BookingReducer.reduce(
                    &mut state.booking,
                    BookingAction::SetCurrentSection(section.clone()),
                    env,
                );
                if state.booking.section_seats.contains_key(&section) {
                    smallvec![Effect::None]
                } else {
                    state.fallback.loading = true;
                    smallvec![Self::fetch_seats_effect(env, section)]
                }
            },
            FallbackAction::ConfirmSelection => Self::confirm_selection(state),
            FallbackAction::RequestExit => {
                state.fallback.exit_prompt = true;
                smallvec![Effect::None]
            },
            FallbackAction::StayWaiting => {
                state.fallback.exit_prompt = false;
                smallvec![Effect::None]
            },
            FallbackAction::AbandonBooking => Self::abandon(state, env),
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

    use crate::config::SECTION_CAPACITY;
    use crate::inventory::MockInventoryProvider;

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

    fn section() -> SectionId {
        SectionId::from("FLOOR-A")
    }

    fn seat_id(index: u16) -> SeatId {
        SeatId::new(section(), index)
    }

    fn active_state_with_seats(count: u16) -> AppState {
        let mut state = AppState::default();
        state.fallback.active = true;
        state.fallback.available_sections = vec![section()];
        state.booking.current_section = Some(section());
        state.booking.section_seats.insert(
            section(),
            (0..count).map(|i| Seat::available(seat_id(i))).collect(),
        );
        state
    }

    #[test]
    fn enter_resets_selection_and_starts_attrition() {
        let mut state = AppState::default();
        state.booking.selection = vec![Seat::selected(seat_id(0))];
        state.booking.current_section = Some(section());

        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(AppAction::Fallback(FallbackAction::Enter))
            .then_state(|state| {
                assert!(state.booking.selection.is_empty());
                assert_eq!(state.booking.current_section, Some(section()));
                assert!(state.fallback.active);
                assert!(state.fallback.loading);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_future_effect(effects);
                assertions::assert_starts_timer(effects, FALLBACK_ATTRITION_TIMER);
            })
            .run();
    }

    #[test]
    fn sections_loaded_picks_first_when_none_current() {
        let mut state = AppState::default();
        state.fallback.active = true;

        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(AppAction::Fallback(FallbackAction::SectionsLoaded(vec![
                section(),
                SectionId::from("FLOOR-B"),
            ])))
            .then_state(|state| {
                assert_eq!(state.booking.current_section, Some(section()));
                assert!(state.fallback.loading);
            })
            .then_effects(|effects| {
                // Seat map for the chosen section is fetched lazily
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn attrition_takes_scripted_count_and_prunes_selection() {
        // take = 2+1 = 3 seats; victims at scripted pool indices 0, 0, 0
        let rng = StepRandom::new().with_belows([2, 0, 0, 0]);
        let env = env_with_rng(Arc::new(rng));

        let mut state = active_state_with_seats(6);
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::SelectSeat(seat_id(0))),
            &env,
        );
        assert_eq!(state.booking.selection.len(), 1);

        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::AttritionTick),
            &env,
        );

        let seats = &state.booking.section_seats[&section()];
        let taken = seats.iter().filter(|s| s.is_taken()).count();
        assert_eq!(taken, 3);
        // Seat 0 was the first victim, so the selection is pruned
        assert!(seats[0].is_taken());
        assert!(state.booking.selection.is_empty());
    }

    #[test]
    fn attrition_on_empty_section_is_a_noop() {
        let env = test_env();
        let mut state = active_state_with_seats(2);
        if let Some(seats) = state.booking.section_seats.get_mut(&section()) {
            for seat in seats {
                seat.status = SeatStatus::Taken;
            }
        }

        let before = state.clone();
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::AttritionTick),
            &env,
        );
        assert_eq!(state, before);
    }

    #[test]
    fn attrition_take_is_capped_by_pool_size() {
        // take would be 3, but only one seat is free
        let rng = StepRandom::new().with_belows([2, 0]);
        let env = env_with_rng(Arc::new(rng));

        let mut state = active_state_with_seats(3);
        if let Some(seats) = state.booking.section_seats.get_mut(&section()) {
            seats[0].status = SeatStatus::Taken;
            seats[1].status = SeatStatus::Taken;
        }

        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::AttritionTick),
            &env,
        );

        let seats = &state.booking.section_seats[&section()];
        assert!(seats.iter().all(Seat::is_taken));
    }

    #[test]
    fn confirm_with_empty_selection_is_refused() {
        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(active_state_with_seats(4))
            .when_action(AppAction::Fallback(FallbackAction::ConfirmSelection))
            .then_state(|state| {
                assert!(state.fallback.active);
                assert_eq!(
                    state.booking.last_rejection,
                    Some(SelectionRejection::EmptySelection)
                );
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn confirm_routes_to_payment_when_not_prepaid() {
        let env = test_env();
        let mut state = active_state_with_seats(4);
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::SelectSeat(seat_id(1))),
            &env,
        );

        let effects = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::ConfirmSelection),
            &env,
        );

        assert!(!state.fallback.active);
        assert!(effects.iter().any(|e| e.cancels_timer(FALLBACK_ATTRITION_TIMER)));
        assert!(effects.iter().any(|e| matches!(e, Effect::Future(_))));
    }

    #[test]
    fn confirm_when_prepaid_completes_booking() {
        let env = test_env();
        let mut state = active_state_with_seats(4);
        state.booking.prepaid = true;
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::SelectSeat(seat_id(1))),
            &env,
        );

        let effects = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::ConfirmSelection),
            &env,
        );

        assert!(effects.iter().any(|e| matches!(e, Effect::Sequential(_))));
    }

    #[test]
    fn exit_prompt_round_trip() {
        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(active_state_with_seats(2))
            .when_action(AppAction::Fallback(FallbackAction::RequestExit))
            .then_state(|state| assert!(state.fallback.exit_prompt))
            .run();

        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(active_state_with_seats(2))
            .when_action(AppAction::Fallback(FallbackAction::RequestExit))
            .when_action(AppAction::Fallback(FallbackAction::StayWaiting))
            .then_state(|state| {
                assert!(!state.fallback.exit_prompt);
                assert!(state.fallback.active);
            })
            .run();
    }

    #[test]
    fn abandon_tears_down_and_navigates_home() {
        let env = test_env();
        let mut state = active_state_with_seats(4);
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::SelectSeat(seat_id(0))),
            &env,
        );

        let effects = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::AbandonBooking),
            &env,
        );

        assert!(!state.fallback.active);
        assert!(state.booking.selection.is_empty());
        assert!(effects.iter().any(|e| e.cancels_timer(FALLBACK_ATTRITION_TIMER)));
        assert!(effects.iter().any(|e| matches!(e, Effect::Future(_))));
    }

    #[test]
    fn inactive_attrition_tick_is_a_noop() {
        let env = test_env();
        let mut state = active_state_with_seats(4);
        state.fallback.active = false;

        let before = state.clone();
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::AttritionTick),
            &env,
        );
        assert_eq!(state, before);
    }

    #[test]
    fn fetch_failed_surfaces_error_and_retry_refetches() {
        let mut state = AppState::default();
        state.fallback.active = true;
        state.fallback.loading = true;

        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(AppAction::Fallback(FallbackAction::FetchFailed {
                what: FetchKind::Sections,
                error: "inventory provider unavailable".to_string(),
            }))
            .then_state(|state| {
                assert!(!state.fallback.loading);
                assert!(state.fallback.fetch_error.is_some());
            })
            .run();

        let mut state = AppState::default();
        state.fallback.active = true;
        state.fallback.fetch_error = Some("boom".to_string());

        ReducerTest::new(FallbackReducer)
            .with_env(test_env())
            .given_state(state)
            .when_action(AppAction::Fallback(FallbackAction::RetryFetch))
            .then_state(|state| {
                assert!(state.fallback.loading);
                assert!(state.fallback.fetch_error.is_none());
            })
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn change_section_fetches_missing_inventory() {
        let other = SectionId::from("FLOOR-B");

        let env = test_env();
        let mut state = active_state_with_seats(4);
        let effects = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::ChangeSection(other.clone())),
            &env,
        );

        assert_eq!(state.booking.current_section, Some(other.clone()));
        assert!(state.fallback.loading);
        assert!(effects.iter().any(|e| matches!(e, Effect::Future(_))));

        // Loading it delivers the full seat map
        let seats: Vec<Seat> = (0..SECTION_CAPACITY)
            .map(|i| Seat::available(SeatId::new(other.clone(), i)))
            .collect();
        let _ = FallbackReducer.reduce(
            &mut state,
            AppAction::Fallback(FallbackAction::SeatsLoaded {
                section: other.clone(),
                seats,
            }),
            &env,
        );
        assert!(!state.fallback.loading);
        assert_eq!(
            state.booking.section_seats[&other].len(),
            usize::from(SECTION_CAPACITY)
        );
    }
}
