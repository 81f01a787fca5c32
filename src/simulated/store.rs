//! Section store over a simulated document

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tokio::sync::Notify;
use tracing::debug;

use super::document::SimDocument;
use crate::model::{Linearity, SectionContent, SectionIndex, SectionInfo, SourceError};
use crate::source::SectionStore;

/// [`SectionStore`] serving sections of a [`SimDocument`], with fault injection.
pub struct SimSectionStore {
    document: SimDocument,
    infos: Vec<SectionInfo>,
    stalled: RefCell<HashMap<usize, Rc<Notify>>>,
    failing: RefCell<HashSet<usize>>,
    held: RefCell<HashSet<usize>>,
    loads: RefCell<Vec<SectionIndex>>,
    unloads: RefCell<Vec<SectionIndex>>,
}

impl SimSectionStore {
    /// Serve a document.
    pub fn new(document: SimDocument) -> Self {
        let infos = document
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| SectionInfo {
                index: SectionIndex::new(i),
                href: s.href.clone(),
                linear: if s.linear {
                    Linearity::Yes
                } else {
                    Linearity::No
                },
            })
            .collect();
        Self {
            document,
            infos,
            stalled: RefCell::new(HashMap::new()),
            failing: RefCell::new(HashSet::new()),
            held: RefCell::new(HashSet::new()),
            loads: RefCell::new(Vec::new()),
            unloads: RefCell::new(Vec::new()),
        }
    }

    /// The served document.
    pub fn document(&self) -> &SimDocument {
        &self.document
    }

    /// Make loads of `index` wait until [`Self::release`].
    pub fn stall(&self, index: usize) {
        self.stalled
            .borrow_mut()
            .entry(index)
            .or_insert_with(|| Rc::new(Notify::new()));
    }

    /// Let stalled loads of `index` proceed.
    pub fn release(&self, index: usize) {
        if let Some(notify) = self.stalled.borrow_mut().remove(&index) {
            notify.notify_waiters();
        }
    }

    /// Make loads of `index` fail.
    pub fn fail(&self, index: usize) {
        self.failing.borrow_mut().insert(index);
    }

    /// Every load call so far, in order.
    pub fn loads(&self) -> Vec<SectionIndex> {
        self.loads.borrow().clone()
    }

    /// Load calls for one section.
    pub fn load_count(&self, index: usize) -> usize {
        self.loads.borrow().iter().filter(|i| i.get() == index).count()
    }

    /// Every unload call so far, in order.
    pub fn unloads(&self) -> Vec<SectionIndex> {
        self.unloads.borrow().clone()
    }

    /// Whether a section's content is currently held.
    pub fn is_held(&self, index: usize) -> bool {
        self.held.borrow().contains(&index)
    }

    /// Sections currently held.
    pub fn held(&self) -> Vec<usize> {
        let mut held: Vec<usize> = self.held.borrow().iter().copied().collect();
        held.sort_unstable();
        held
    }
}

impl SectionStore for SimSectionStore {
    fn document_key(&self) -> &str {
        &self.document.key
    }

    fn sections(&self) -> &[SectionInfo] {
        &self.infos
    }

    fn load(
        &self,
        index: SectionIndex,
    ) -> LocalBoxFuture<'_, Result<Rc<SectionContent>, SourceError>> {
        Box::pin(async move {
            self.loads.borrow_mut().push(index);

            let stall = self.stalled.borrow().get(&index.get()).cloned();
            if let Some(notify) = stall {
                debug!(%index, "Section load stalled");
                notify.notified().await;
            }

            if self.failing.borrow().contains(&index.get()) {
                return Err(SourceError::Unavailable {
                    index,
                    reason: "injected failure".to_string(),
                });
            }

            let section = self
                .document
                .sections
                .get(index.get())
                .ok_or(SourceError::NoSuchSection(index))?;

            tokio::task::yield_now().await;
            self.held.borrow_mut().insert(index.get());
            Ok(Rc::new(section.to_content(index)))
        })
    }

    fn unload(&self, index: SectionIndex) {
        self.unloads.borrow_mut().push(index);
        self.held.borrow_mut().remove(&index.get());
    }
}
