//! Position events consumed by history and UI collaborators

use serde::Serialize;

use super::section::SectionIndex;
use crate::sentinel::ContentRange;

/// Why a relocate happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelocateReason {
    /// Explicit `go_to`.
    Navigation,
    /// In-section page turn.
    Page,
    /// Re-layout after a viewport or settings change.
    Resize,
    /// Free scrolling in scrolled flow.
    Scroll,
    /// Restoring a saved position.
    Restore,
}

/// Position-changed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateEvent {
    /// Cause of the move.
    pub reason: RelocateReason,
    /// Displayed section.
    pub index: SectionIndex,
    /// Progress through the section in `[0.0, 1.0]`.
    pub fraction: f64,
    /// Current page (0-based); absent when nothing is displayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
    /// Pages in the section; `>= 1` whenever present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Visible content range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ContentRange>,
}

/// Events emitted by the navigation controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PagerEvent {
    /// The visible position changed.
    Relocate(RelocateEvent),
    /// A section finished loading into the surface.
    #[serde(rename_all = "camelCase")]
    Load {
        /// Loaded section.
        index: SectionIndex,
        /// Href of the loaded section.
        location: String,
    },
    /// A navigation was accepted.
    #[serde(rename_all = "camelCase")]
    GoTo {
        /// Whether a different section is about to load.
        will_load_new_index: bool,
    },
    /// A navigation finished displaying.
    DidDisplay,
}

impl PagerEvent {
    /// The relocate payload, if this is a relocate.
    pub fn as_relocate(&self) -> Option<&RelocateEvent> {
        match self {
            Self::Relocate(event) => Some(event),
            _ => None,
        }
    }
}
