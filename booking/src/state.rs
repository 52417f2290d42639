//! Booking state and reducer
//!
//! All seat and selection mutation in the engine flows through
//! [`BookingReducer`]. The waiting-room and fallback reducers never touch
//! seat state directly; they dispatch [`BookingAction`]s into this reducer
//! under the same write lock, so every invariant is enforced in one place.

use seatrush_core::effect::Effect;
use seatrush_core::reducer::{Effects, Reducer};
use smallvec::smallvec;
use std::collections::HashMap;
use std::fmt;

use crate::config::{MAX_SELECTION, SEAT_PRICE_WON};
use crate::env::BookingEnvironment;
use crate::types::{
    AttendeeInfo, BookedTicket, PaymentMethod, Seat, SeatId, SeatStatus, SectionId,
};

/// Why the last selection-changing action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRejection {
    /// The selection already holds the maximum number of seats.
    SelectionLimit,
    /// The seat is already claimed by a competing buyer.
    SeatTaken,
    /// Confirmation attempted with an empty selection.
    EmptySelection,
}

impl fmt::Display for SelectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::SelectionLimit => "you can select up to 3 seats",
            Self::SeatTaken => "that seat was just taken",
            Self::EmptySelection => "select at least one seat first",
        };
        f.write_str(message)
    }
}

/// Everything the booking flow accumulates between the calendar step and the
/// confirmation page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingState {
    /// Sections wish-listed in the venue viewer.
    pub selected_sections: Vec<SectionId>,
    /// Seats the user currently holds, at most [`MAX_SELECTION`].
    pub selection: Vec<Seat>,
    /// Section whose seat map is on screen.
    pub current_section: Option<SectionId>,
    /// Fetched seat maps, keyed by section.
    pub section_seats: HashMap<SectionId, Vec<Seat>>,
    /// Chosen show date.
    pub selected_date: Option<String>,
    /// Chosen show time slot.
    pub selected_time: Option<String>,
    /// Number of attendees.
    pub guest_count: u32,
    /// Payment method for the pending booking.
    pub payment_method: PaymentMethod,
    /// Whether payment already settled upstream of seat confirmation.
    pub prepaid: bool,
    /// Attendee details collected before payment.
    pub attendees: Vec<AttendeeInfo>,
    /// Completed bookings, oldest first.
    pub booked_tickets: Vec<BookedTicket>,
    /// Why the last selection-changing action was refused, if it was.
    pub last_rejection: Option<SelectionRejection>,
}

impl BookingState {
    /// Seats in the selection not yet claimed by competitors.
    #[must_use]
    pub fn live_selection(&self) -> Vec<Seat> {
        self.selection
            .iter()
            .filter(|seat| !seat.is_taken())
            .cloned()
            .collect()
    }

    /// Whether every seat in the selection has been claimed by competitors.
    ///
    /// Derived on demand rather than stored, so it can never disagree with
    /// the seat statuses it summarizes.
    #[must_use]
    pub fn all_selected_taken(&self) -> bool {
        !self.selection.is_empty() && self.selection.iter().all(Seat::is_taken)
    }

    /// Total price of the current selection, in won.
    #[must_use]
    pub fn selection_amount(&self) -> u64 {
        self.selection.len() as u64 * SEAT_PRICE_WON
    }

    fn clear_selection_fields(&mut self) {
        self.selected_sections.clear();
        self.selection.clear();
        self.current_section = None;
        self.section_seats.clear();
        self.selected_date = None;
        self.selected_time = None;
        self.guest_count = 0;
        self.payment_method = PaymentMethod::default();
        self.prepaid = false;
        self.attendees.clear();
        self.last_rejection = None;
    }
}

/// Actions handled by [`BookingReducer`].
#[derive(Debug, Clone, PartialEq)]
pub enum BookingAction {
    /// Replace the cached seat map for a section.
    SetSectionInventory {
        /// Section the seats belong to.
        section: SectionId,
        /// The full seat map.
        seats: Vec<Seat>,
    },
    /// Replace the selection wholesale (contention resolution commit).
    SetSelection(Vec<Seat>),
    /// Toggle a seat in or out of the selection.
    SelectSeat(SeatId),
    /// Set one seat's status in the inventory and in the selection.
    UpdateSeatStatus {
        /// The seat to update.
        seat: SeatId,
        /// Its new status.
        status: SeatStatus,
    },
    /// Toggle a section on the wishlist.
    ToggleSection(SectionId),
    /// Replace the wishlist wholesale.
    SetSelectedSections(Vec<SectionId>),
    /// Switch the seat map on screen.
    SetCurrentSection(SectionId),
    /// Choose the show date.
    SetDate(String),
    /// Choose the show time slot.
    SetTime(String),
    /// Set the attendee headcount.
    SetGuestCount(u32),
    /// Choose how to pay.
    SetPaymentMethod(PaymentMethod),
    /// Mark payment as settled upstream of seat confirmation.
    SetPrepaid(bool),
    /// Replace the attendee details.
    SetAttendees(Vec<AttendeeInfo>),
    /// Mint a ticket from the current selection and clear the flow state.
    CompleteBooking,
    /// Drop the selection but keep dates, sections, and inventories.
    ClearSelection,
    /// Full clear of all selection state; booking history is preserved.
    ResetBooking,
}

/// Pure reducer over [`BookingState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingReducer;

impl BookingReducer {
    fn select_seat(state: &mut BookingState, id: SeatId) {
        if let Some(position) = state.selection.iter().position(|seat| seat.id == id) {
            state.selection.remove(position);
            state.last_rejection = None;
            return;
        }

        let status = state
            .section_seats
            .get(id.section())
            .and_then(|seats| seats.iter().find(|seat| seat.id == id))
            .map(|seat| seat.status);

        match status {
            Some(SeatStatus::Taken) => {
                tracing::warn!(seat = %id, "refused selection of a taken seat");
                state.last_rejection = Some(SelectionRejection::SeatTaken);
            },
            Some(_) if state.selection.len() >= MAX_SELECTION => {
                tracing::warn!(seat = %id, "selection limit reached");
                state.last_rejection = Some(SelectionRejection::SelectionLimit);
            },
            Some(_) => {
                state.selection.push(Seat::selected(id));
                state.last_rejection = None;
            },
            None => {
                tracing::warn!(seat = %id, "selection of a seat with no loaded inventory ignored");
            },
        }
    }

    fn update_seat_status(state: &mut BookingState, id: &SeatId, status: SeatStatus) {
        let mut found = false;

        if let Some(seats) = state.section_seats.get_mut(id.section()) {
            if let Some(seat) = seats.iter_mut().find(|seat| seat.id == *id) {
                seat.status = status;
                found = true;
            }
        }

        if let Some(seat) = state.selection.iter_mut().find(|seat| seat.id == *id) {
            seat.status = status;
            found = true;
        }

        if !found {
            tracing::debug!(seat = %id, "status update for unknown seat ignored");
        }
    }

    fn complete_booking(state: &mut BookingState, env: &BookingEnvironment) {
        if state.selection.is_empty() {
            state.last_rejection = Some(SelectionRejection::EmptySelection);
            return;
        }

        let ticket = BookedTicket {
            seats: state.selection.clone(),
            date: state.selected_date.clone().unwrap_or_default(),
            time: state.selected_time.clone().unwrap_or_default(),
            payment_method: state.payment_method,
            amount: state.selection_amount(),
            booked_at: env.clock.now(),
        };

        tracing::info!(
            seats = ticket.seats.len(),
            amount = ticket.amount,
            method = %ticket.payment_method,
            "booking completed"
        );

        state.booked_tickets.push(ticket);
        state.clear_selection_fields();
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            BookingAction::SetSectionInventory { section, seats } => {
                state.section_seats.insert(section, seats);
            },
            BookingAction::SetSelection(seats) => {
                if seats.len() > MAX_SELECTION {
                    tracing::warn!(
                        count = seats.len(),
                        "refused selection replacement above the limit"
                    );
                    state.last_rejection = Some(SelectionRejection::SelectionLimit);
                } else {
                    state.selection = seats;
                    state.last_rejection = None;
                }
            },
            BookingAction::SelectSeat(id) => Self::select_seat(state, id),
            BookingAction::UpdateSeatStatus { seat, status } => {
                Self::update_seat_status(state, &seat, status);
            },
            BookingAction::ToggleSection(section) => {
                if let Some(position) = state
                    .selected_sections
                    .iter()
                    .position(|existing| *existing == section)
                {
                    state.selected_sections.remove(position);
                } else {
                    state.selected_sections.push(section);
                }
            },
            BookingAction::SetSelectedSections(sections) => {
                state.selected_sections = sections;
            },
            BookingAction::SetCurrentSection(section) => {
                state.current_section = Some(section);
            },
            BookingAction::SetDate(date) => state.selected_date = Some(date),
            BookingAction::SetTime(time) => state.selected_time = Some(time),
            BookingAction::SetGuestCount(count) => state.guest_count = count,
            BookingAction::SetPaymentMethod(method) => state.payment_method = method,
            BookingAction::SetPrepaid(prepaid) => state.prepaid = prepaid,
            BookingAction::SetAttendees(attendees) => state.attendees = attendees,
            BookingAction::CompleteBooking => Self::complete_booking(state, env),
            BookingAction::ClearSelection => {
                state.selection.clear();
                state.last_rejection = None;
            },
            BookingAction::ResetBooking => {
                state.clear_selection_fields();
            },
        }

        smallvec![Effect::None]
    }
}
