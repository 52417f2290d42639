//! Domain types for venue layout, seats, and booked tickets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ROW_WIDTH;

/// Identifier of a venue section (e.g. `FLOOR-A`, `1F-LEFT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(String);

impl SectionId {
    /// Create a section id from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The section name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifier of a single seat: a section plus a zero-based index within it.
///
/// Row and seat number are derived from the index against the fixed row
/// width, so the id is the single source of truth and never needs to be
/// re-parsed from a display string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatId {
    section: SectionId,
    index: u16,
}

impl SeatId {
    /// Create a seat id.
    #[must_use]
    pub const fn new(section: SectionId, index: u16) -> Self {
        Self { section, index }
    }

    /// The section this seat belongs to.
    #[must_use]
    pub const fn section(&self) -> &SectionId {
        &self.section
    }

    /// Zero-based index within the section.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// One-based row number.
    #[must_use]
    pub const fn row(&self) -> u16 {
        self.index / ROW_WIDTH + 1
    }

    /// One-based seat number within the row.
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.index % ROW_WIDTH + 1
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.section, self.index)
    }
}

/// Lifecycle status of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// Free for anyone to pick.
    Available,
    /// In the current user's selection.
    Selected,
    /// Claimed by a competing buyer.
    Taken,
}

/// A seat together with its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Structured identifier.
    pub id: SeatId,
    /// Current status.
    pub status: SeatStatus,
}

impl Seat {
    /// Create an available seat.
    #[must_use]
    pub const fn available(id: SeatId) -> Self {
        Self {
            id,
            status: SeatStatus::Available,
        }
    }

    /// Create a selected seat.
    #[must_use]
    pub const fn selected(id: SeatId) -> Self {
        Self {
            id,
            status: SeatStatus::Selected,
        }
    }

    /// Whether the seat can still be picked.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Whether a competing buyer has claimed the seat.
    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.status == SeatStatus::Taken
    }

    /// Human-readable label, e.g. `FLOOR-A row 2 seat 3`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} row {} seat {}",
            self.id.section(),
            self.id.row(),
            self.id.number()
        )
    }
}

/// How the buyer pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Toss Pay.
    #[default]
    Toss,
    /// Kakao Pay.
    Kakao,
    /// Naver Pay.
    Naver,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Toss => "Toss Pay",
            Self::Kakao => "Kakao Pay",
            Self::Naver => "Naver Pay",
        };
        f.write_str(name)
    }
}

/// Attendee details collected before payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeInfo {
    /// Full name.
    pub name: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
    /// Contact email.
    pub email: String,
}

/// A completed booking, appended to the history when payment settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedTicket {
    /// The seats this ticket covers.
    pub seats: Vec<Seat>,
    /// Show date as chosen in the calendar step.
    pub date: String,
    /// Show time slot.
    pub time: String,
    /// Payment method used.
    pub payment_method: PaymentMethod,
    /// Total amount in won.
    pub amount: u64,
    /// When the booking completed.
    pub booked_at: DateTime<Utc>,
}
