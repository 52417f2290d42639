//! Seat inventory provider
//!
//! The booking engine never invents seats; it asks a [`SeatInventoryProvider`]
//! for the sections on sale and the seat map of each. In production this
//! would front a reservation service; here [`MockInventoryProvider`]
//! generates a full venue deterministically, which is all the contention
//! simulation needs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::SECTION_CAPACITY;
use crate::types::{Seat, SeatId, SectionId};

/// Sections on sale, in display order.
pub const DEFAULT_SECTIONS: [&str; 5] = ["FLOOR-A", "FLOOR-B", "FLOOR-C", "1F-LEFT", "1F-RIGHT"];

/// Errors from the inventory provider.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The provider could not be reached.
    #[error("inventory provider unavailable: {0}")]
    Unavailable(String),

    /// The requested section does not exist.
    #[error("unknown section: {0}")]
    UnknownSection(SectionId),
}

/// Source of venue sections and seat maps.
#[async_trait]
pub trait SeatInventoryProvider: Send + Sync {
    /// Sections currently on sale.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Unavailable`] if the provider cannot be
    /// reached.
    async fn fetch_available_sections(&self) -> Result<Vec<SectionId>, InventoryError>;

    /// The full seat map for one section.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnknownSection`] for a section the venue
    /// does not have, or [`InventoryError::Unavailable`] on provider failure.
    async fn fetch_section_seats(&self, section: &SectionId) -> Result<Vec<Seat>, InventoryError>;
}

/// In-memory provider generating every section at full capacity.
///
/// Supports injected latency and a bounded number of initial failures so
/// tests can exercise the retry path without a network.
pub struct MockInventoryProvider {
    latency: Duration,
    remaining_failures: AtomicUsize,
}

impl MockInventoryProvider {
    /// Provider with no latency and no injected failures.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            remaining_failures: AtomicUsize::new(0),
        }
    }

    /// Add a fixed delay to every fetch.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `count` fetches with [`InventoryError::Unavailable`].
    #[must_use]
    pub fn with_initial_failures(self, count: usize) -> Self {
        self.remaining_failures.store(count, Ordering::Release);
        self
    }

    async fn simulate_call(&self) -> Result<(), InventoryError> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }

        let mut remaining = self.remaining_failures.load(Ordering::Acquire);
        while remaining > 0 {
            match self.remaining_failures.compare_exchange(
                remaining,
                remaining - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Err(InventoryError::Unavailable(
                        "injected transient failure".to_string(),
                    ));
                },
                Err(observed) => remaining = observed,
            }
        }

        Ok(())
    }
}

impl Default for MockInventoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatInventoryProvider for MockInventoryProvider {
    async fn fetch_available_sections(&self) -> Result<Vec<SectionId>, InventoryError> {
        self.simulate_call().await?;
        Ok(DEFAULT_SECTIONS.iter().map(|s| SectionId::from(*s)).collect())
    }

    async fn fetch_section_seats(&self, section: &SectionId) -> Result<Vec<Seat>, InventoryError> {
        self.simulate_call().await?;

        if !DEFAULT_SECTIONS.contains(&section.as_str()) {
            return Err(InventoryError::UnknownSection(section.clone()));
        }

        Ok((0..SECTION_CAPACITY)
            .map(|index| Seat::available(SeatId::new(section.clone(), index)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_lists_all_sections() {
        let provider = MockInventoryProvider::new();
        let sections = provider
            .fetch_available_sections()
            .await
            .unwrap_or_default();

        assert_eq!(sections.len(), DEFAULT_SECTIONS.len());
        assert_eq!(sections[0], SectionId::from("FLOOR-A"));
    }

    #[tokio::test]
    async fn mock_provider_generates_full_sections() {
        let provider = MockInventoryProvider::new();
        let seats = provider
            .fetch_section_seats(&SectionId::from("FLOOR-B"))
            .await
            .unwrap_or_default();

        assert_eq!(seats.len(), usize::from(SECTION_CAPACITY));
        assert!(seats.iter().all(Seat::is_available));
        assert_eq!(seats[0].id.index(), 0);
        assert_eq!(seats[159].id.index(), 159);
    }

    #[tokio::test]
    async fn mock_provider_rejects_unknown_section() {
        let provider = MockInventoryProvider::new();
        let result = provider
            .fetch_section_seats(&SectionId::from("BALCONY-Z"))
            .await;

        assert!(matches!(result, Err(InventoryError::UnknownSection(_))));
    }

    #[tokio::test]
    async fn mock_provider_injected_failures_are_transient() {
        let provider = MockInventoryProvider::new().with_initial_failures(2);

        assert!(provider.fetch_available_sections().await.is_err());
        assert!(provider.fetch_available_sections().await.is_err());
        assert!(provider.fetch_available_sections().await.is_ok());
    }
}
