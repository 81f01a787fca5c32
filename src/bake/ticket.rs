//! View tickets for discarding stale bakes
//!
//! Every LayoutView is issued a ticket when it is created. The navigation
//! controller keeps the ticket of the displayed view on a shared board; a
//! bake whose ticket no longer matches the board belongs to a view that was
//! replaced while it was measuring.

use std::cell::Cell;
use std::rc::Rc;

use crate::model::SectionIndex;

/// Identity of one LayoutView instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewTicket {
    /// Monotonic view generation.
    pub generation: u64,
    /// Section the view displays.
    pub section: SectionIndex,
}

#[derive(Debug, Default)]
struct BoardState {
    next_generation: Cell<u64>,
    active: Cell<Option<ViewTicket>>,
}

/// Shared record of the active view ticket.
#[derive(Debug, Clone, Default)]
pub struct TicketBoard(Rc<BoardState>);

impl TicketBoard {
    /// Create a board with no active view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh ticket. It does not become active until [`Self::activate`].
    pub fn issue(&self, section: SectionIndex) -> ViewTicket {
        let generation = self.0.next_generation.get() + 1;
        self.0.next_generation.set(generation);
        ViewTicket {
            generation,
            section,
        }
    }

    /// Make a ticket the active one.
    pub fn activate(&self, ticket: ViewTicket) {
        self.0.active.set(Some(ticket));
    }

    /// Clear the active ticket (nothing displayed).
    pub fn deactivate(&self) {
        self.0.active.set(None);
    }

    /// The active ticket, if any.
    pub fn active(&self) -> Option<ViewTicket> {
        self.0.active.get()
    }

    /// Whether `ticket` is the active one.
    pub fn is_current(&self, ticket: ViewTicket) -> bool {
        self.active() == Some(ticket)
    }
}
