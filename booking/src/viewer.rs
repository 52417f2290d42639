//! Venue viewer port
//!
//! The 3D venue viewer renders out-of-process; this port is the narrow
//! bridge between it and the store. The engine pushes the focused section
//! and the wishlist in; the viewer emits selection and wishlist-toggle
//! events out, which are translated into booking actions.

use std::collections::BTreeSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::flow::{AppAction, AppReducer, AppState};
use crate::state::BookingAction;
use crate::types::SectionId;

/// Events emitted by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The user clicked a section to open its seat map.
    SectionChosen(SectionId),
    /// The user toggled a section on the wishlist.
    WishlistToggled(SectionId),
}

/// Bridge between the rendering layer and the store.
pub struct ViewerPort {
    focused: Mutex<Option<SectionId>>,
    wishlist: Mutex<BTreeSet<SectionId>>,
    events: mpsc::UnboundedSender<ViewerEvent>,
}

impl ViewerPort {
    /// Create a port and the receiving end of its event stream.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ViewerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                focused: Mutex::new(None),
                wishlist: Mutex::new(BTreeSet::new()),
                events,
            },
            receiver,
        )
    }

    /// Highlight a section in the viewer.
    pub fn focus(&self, section: SectionId) {
        *self
            .focused
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(section);
    }

    /// Currently highlighted section.
    #[must_use]
    pub fn focused(&self) -> Option<SectionId> {
        self.focused
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replace the set of wish-listed sections.
    pub fn set_wishlist<I: IntoIterator<Item = SectionId>>(&self, sections: I) {
        *self
            .wishlist
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = sections.into_iter().collect();
    }

    /// Wish-listed sections, in sorted order.
    #[must_use]
    pub fn wishlist(&self) -> Vec<SectionId> {
        self.wishlist
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Viewer-side: the user clicked a section.
    pub fn choose_section(&self, section: SectionId) {
        let _ = self.events.send(ViewerEvent::SectionChosen(section));
    }

    /// Viewer-side: the user toggled a section on the wishlist.
    pub fn toggle_wishlist(&self, section: SectionId) {
        let _ = self.events.send(ViewerEvent::WishlistToggled(section));
    }
}

/// Translate a viewer event into the booking action it stands for.
#[must_use]
pub fn viewer_action(event: ViewerEvent) -> AppAction {
    match event {
        ViewerEvent::SectionChosen(section) => {
            AppAction::Booking(BookingAction::SetCurrentSection(section))
        },
        ViewerEvent::WishlistToggled(section) => {
            AppAction::Booking(BookingAction::ToggleSection(section))
        },
    }
}

/// The concrete store type the booking engine runs on.
pub type AppStore =
    seatrush_runtime::store::Store<AppState, AppAction, crate::env::BookingEnvironment, AppReducer>;

/// Forward viewer events into the store until either side closes.
pub async fn forward_viewer_events(
    store: AppStore,
    mut events: mpsc::UnboundedReceiver<ViewerEvent>,
) {
    while let Some(event) = events.recv().await {
        if store.send(viewer_action(event)).await.is_err() {
            tracing::debug!("store shut down, stopping viewer event forwarding");
            break;
        }
    }
}
