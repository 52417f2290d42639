//! Demo driver: runs one booking flow end to end on the console.

use std::time::Duration;

use seatrush_booking::fallback::FallbackAction;
use seatrush_booking::inventory::SeatInventoryProvider;
use seatrush_booking::state::BookingAction;
use seatrush_booking::types::SectionId;
use seatrush_booking::waiting::status_message;
use seatrush_booking::{
    AppAction, AppReducer, AppState, AppStore, BookingEnvironment, ContentionOutcome, FlowAction,
    Route,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let environment = BookingEnvironment::production();
    let store: AppStore = AppStore::new(AppState::default(), AppReducer::default(), environment.clone());

    // Calendar and section steps
    store
        .send(AppAction::Booking(BookingAction::SetDate(
            "2026-09-12".to_string(),
        )))
        .await?;
    store
        .send(AppAction::Booking(BookingAction::SetTime(
            "20:00".to_string(),
        )))
        .await?;

    let section = SectionId::from("FLOOR-A");
    let seats = environment.inventory.fetch_section_seats(&section).await?;
    store
        .send(AppAction::Booking(BookingAction::SetCurrentSection(
            section.clone(),
        )))
        .await?;
    store
        .send(AppAction::Booking(BookingAction::SetSectionInventory {
            section,
            seats: seats.clone(),
        }))
        .await?;

    // Pick two seats and enter the waiting room
    for seat in seats.iter().take(2) {
        store
            .send(AppAction::Booking(BookingAction::SelectSeat(
                seat.id.clone(),
            )))
            .await?;
    }

    let selected = store
        .state(|s| {
            s.booking
                .selection
                .iter()
                .map(seatrush_booking::types::Seat::label)
                .collect::<Vec<_>>()
        })
        .await;
    println!("holding: {}", selected.join(", "));
    println!("entering the waiting room...");

    let reporter = {
        let store = store.clone();
        tokio::spawn(async move {
            use seatrush_booking::waiting::WaitingPhase;
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                let (phase, line) = store
                    .state(|s| {
                        (
                            s.waiting.phase,
                            format!("{:>2}s  {}", s.waiting.time_left, status_message(s)),
                        )
                    })
                    .await;
                match phase {
                    WaitingPhase::Running => println!("{line}"),
                    WaitingPhase::Idle => {},
                    WaitingPhase::Succeeded | WaitingPhase::Fallback => break,
                }
            }
        })
    };

    let resolution = store
        .send_and_wait_for(
            AppAction::Flow(FlowAction::Navigate(Route::Waiting)),
            |action| matches!(action, AppAction::Flow(FlowAction::ContentionResolved(_))),
            Duration::from_secs(30),
        )
        .await?;
    let _ = reporter.await;

    match resolution {
        AppAction::Flow(FlowAction::ContentionResolved(ContentionOutcome::Booked { seats })) => {
            println!("success! booked {} seat(s):", seats.len());
            for seat in &seats {
                println!("  {}", seat.label());
            }
        },
        AppAction::Flow(FlowAction::ContentionResolved(ContentionOutcome::Fallback)) => {
            println!("all seats taken, moving to the manual seat page");
            run_fallback(&store).await?;
        },
        _ => {},
    }

    let tickets = store.state(|s| s.booking.booked_tickets.clone()).await;
    for ticket in tickets {
        println!(
            "ticket: {} seat(s), {} won, {} {}",
            ticket.seats.len(),
            ticket.amount,
            ticket.date,
            ticket.time
        );
    }

    store.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

/// Grab the first seat that is still free on the fallback page.
async fn run_fallback(store: &AppStore) -> anyhow::Result<()> {
    // Let the inventory load and the attrition loop chew a little
    tokio::time::sleep(Duration::from_millis(500)).await;

    let first_free = store
        .state(|s| {
            s.booking.current_section.clone().and_then(|section| {
                s.booking
                    .section_seats
                    .get(&section)
                    .and_then(|seats| seats.iter().find(|seat| seat.is_available()))
                    .map(|seat| seat.id.clone())
            })
        })
        .await;

    let Some(seat) = first_free else {
        println!("no free seats left, giving up");
        store
            .send(AppAction::Fallback(FallbackAction::AbandonBooking))
            .await?;
        return Ok(());
    };

    store
        .send(AppAction::Fallback(FallbackAction::SelectSeat(seat.clone())))
        .await?;
    let held = store
        .state(|s| s.booking.selection.iter().any(|s2| s2.id == seat))
        .await;
    if held {
        println!("grabbed {seat}");
        store
            .send(AppAction::Fallback(FallbackAction::ConfirmSelection))
            .await?;
        // Not prepaid in this demo: confirm lands on the payment page
        store
            .send(AppAction::Booking(BookingAction::CompleteBooking))
            .await?;
    } else {
        println!("lost {seat} before confirmation");
    }
    Ok(())
}
