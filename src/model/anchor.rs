//! Position anchors restored after re-layout

use std::fmt;
use std::rc::Rc;

use super::section::SectionContent;
use super::tracking::{ContentOutline, TrackingId};
use crate::sentinel::ContentRange;

/// Resolver evaluated against freshly loaded content.
pub type AnchorResolver = Rc<dyn Fn(&SectionContent, &ContentOutline) -> Anchor>;

/// Position descriptor used to restore the reading position.
///
/// A sum type that preserves intent across layout changes:
/// - `Fraction`: proportional position within the section (0.0 = start, 1.0 = end)
/// - `Range`: keep a content range on screen
/// - `Element`: keep a tracking section on screen
/// - `Resolver`: computed from the loaded content (e.g. fragment identifiers)
#[derive(Clone)]
pub enum Anchor {
    /// Proportional position, clamped to `[0.0, 1.0]` on resolution.
    Fraction(f64),
    /// Content range in sentinel ordinals.
    Range(ContentRange),
    /// Tracking section by id.
    Element(TrackingId),
    /// Deferred resolution; may not resolve to another `Resolver`.
    Resolver(AnchorResolver),
}

impl Anchor {
    /// Anchor at the first page.
    pub fn start() -> Self {
        Self::Fraction(0.0)
    }

    /// Anchor at the last page.
    pub fn end() -> Self {
        Self::Fraction(1.0)
    }

    /// Wrap a resolver closure.
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&SectionContent, &ContentOutline) -> Anchor + 'static,
    {
        Self::Resolver(Rc::new(f))
    }

    /// Evaluate a resolver against content. Nested resolvers fall back to the start.
    pub fn resolve_with(&self, content: &SectionContent, outline: &ContentOutline) -> Anchor {
        match self {
            Self::Resolver(f) => match f(content, outline) {
                Self::Resolver(_) => Self::start(),
                resolved => resolved,
            },
            other => other.clone(),
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fraction(x) => f.debug_tuple("Fraction").field(x).finish(),
            Self::Range(r) => f.debug_tuple("Range").field(r).finish(),
            Self::Element(id) => f.debug_tuple("Element").field(id).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Fraction(a), Self::Fraction(b)) => a == b,
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Element(a), Self::Element(b)) => a == b,
            (Self::Resolver(a), Self::Resolver(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
