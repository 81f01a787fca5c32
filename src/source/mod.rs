//! Section store interface.
//!
//! The section store owns document bytes, section ordering, the `linear` flag,
//! and href resolution. The paginator only asks it for content handles and
//! tells it when a section is no longer needed.

use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::model::{SectionContent, SectionIndex, SectionInfo, SourceError};

/// Supplier of section content.
///
/// All futures are polled on a single-threaded executor; implementations may
/// hold `Rc`/`RefCell` state.
pub trait SectionStore {
    /// Stable identity of the document, part of every geometry cache key.
    fn document_key(&self) -> &str;

    /// Sections in reading order; `sections()[i].index == i`.
    fn sections(&self) -> &[SectionInfo];

    /// Load a section's content.
    ///
    /// Idempotent while the section is held: repeated loads return equal content.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the bytes cannot be produced.
    fn load(
        &self,
        index: SectionIndex,
    ) -> LocalBoxFuture<'_, Result<Rc<SectionContent>, SourceError>>;

    /// Release a section's content.
    fn unload(&self, index: SectionIndex);

    /// Number of sections.
    fn section_count(&self) -> usize {
        self.sections().len()
    }

    /// Metadata for one section.
    fn section(&self, index: SectionIndex) -> Option<&SectionInfo> {
        self.sections().get(index.get())
    }
}
