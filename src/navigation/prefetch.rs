//! Neighbor prefetching.
//!
//! Each entry is a lazily-polled shared load future, so the navigation that
//! eventually needs the section and the idle-time driver await the same load.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use tracing::debug;

use crate::model::{SectionContent, SectionIndex, SourceError};
use crate::source::SectionStore;

/// Output of a section load.
pub type LoadResult = Result<Rc<SectionContent>, SourceError>;

/// Load future that any number of waiters can await.
pub type SharedLoad = Shared<LocalBoxFuture<'static, LoadResult>>;

/// Start-on-first-poll load of one section.
pub fn shared_load(store: Rc<dyn SectionStore>, index: SectionIndex) -> SharedLoad {
    async move { store.load(index).await }.boxed_local().shared()
}

/// Prefetched neighbors keyed by section index.
pub struct Prefetcher {
    store: Rc<dyn SectionStore>,
    entries: RefCell<BTreeMap<SectionIndex, SharedLoad>>,
}

impl std::fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetcher")
            .field("indices", &self.indices())
            .finish()
    }
}

impl Prefetcher {
    /// Create an empty prefetcher over a store.
    pub fn new(store: Rc<dyn SectionStore>) -> Self {
        Self {
            store,
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    /// Indices with an entry.
    pub fn indices(&self) -> Vec<SectionIndex> {
        self.entries.borrow().keys().copied().collect()
    }

    /// Whether an entry exists for a section.
    pub fn contains(&self, index: SectionIndex) -> bool {
        self.entries.borrow().contains_key(&index)
    }

    /// Add a lazy entry unless one exists.
    pub fn ensure(&self, index: SectionIndex) {
        self.entries
            .borrow_mut()
            .entry(index)
            .or_insert_with(|| shared_load(self.store.clone(), index));
    }

    /// Add an entry for content that is already loaded.
    pub fn insert_ready(&self, index: SectionIndex, content: Rc<SectionContent>) {
        let ready: LocalBoxFuture<'static, LoadResult> = future::ready(Ok(content)).boxed_local();
        self.entries.borrow_mut().insert(index, ready.shared());
    }

    /// Remove and return an entry.
    pub fn take(&self, index: SectionIndex) -> Option<SharedLoad> {
        self.entries.borrow_mut().remove(&index)
    }

    /// Drop every entry not in `keep`.
    ///
    /// Returns the evicted indices whose load had completed successfully; the
    /// caller owns unloading them.
    pub fn retain(&self, keep: &[SectionIndex]) -> Vec<SectionIndex> {
        let mut entries = self.entries.borrow_mut();
        let evicted: Vec<SectionIndex> = entries
            .keys()
            .filter(|index| !keep.contains(index))
            .copied()
            .collect();

        evicted
            .into_iter()
            .filter(|index| {
                let loaded = entries
                    .remove(index)
                    .is_some_and(|entry| matches!(entry.peek(), Some(Ok(_))));
                debug!(%index, loaded, "Prefetch entry evicted");
                loaded
            })
            .collect()
    }

    /// Drive every pending entry to completion; returns how many loaded successfully.
    pub async fn drive_idle(&self) -> usize {
        let pending: Vec<SharedLoad> = self
            .entries
            .borrow()
            .values()
            .filter(|entry| entry.peek().is_none())
            .cloned()
            .collect();
        if pending.is_empty() {
            return 0;
        }
        let results = future::join_all(pending).await;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        debug!(loaded, attempted = results.len(), "Idle prefetch complete");
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimDocument, SimSectionStore};

    fn store() -> Rc<SimSectionStore> {
        Rc::new(SimSectionStore::new(SimDocument::uniform("doc", 4, 1, 100.0, 0)))
    }

    #[tokio::test]
    async fn entries_are_lazy_until_driven() {
        let store = store();
        let prefetcher = Prefetcher::new(store.clone());
        prefetcher.ensure(SectionIndex::new(1));
        prefetcher.ensure(SectionIndex::new(1));
        assert_eq!(store.load_count(1), 0);

        assert_eq!(prefetcher.drive_idle().await, 1);
        assert_eq!(store.load_count(1), 1);
        assert_eq!(prefetcher.drive_idle().await, 0);
    }

    #[tokio::test]
    async fn taken_entry_reuses_the_shared_load() {
        let store = store();
        let prefetcher = Prefetcher::new(store.clone());
        prefetcher.ensure(SectionIndex::new(2));
        prefetcher.drive_idle().await;

        let content = prefetcher.take(SectionIndex::new(2)).unwrap().await.unwrap();
        assert_eq!(content.href, "s002.xhtml");
        assert_eq!(store.load_count(2), 1);
        assert!(!prefetcher.contains(SectionIndex::new(2)));
    }

    #[tokio::test]
    async fn retain_reports_only_loaded_evictions() {
        let store = store();
        let prefetcher = Prefetcher::new(store.clone());
        prefetcher.ensure(SectionIndex::new(0));
        prefetcher.drive_idle().await;
        prefetcher.ensure(SectionIndex::new(2));
        prefetcher.ensure(SectionIndex::new(3));

        let evicted = prefetcher.retain(&[SectionIndex::new(3)]);
        assert_eq!(evicted, vec![SectionIndex::new(0)]);
        assert_eq!(prefetcher.indices(), vec![SectionIndex::new(3)]);
    }

    #[tokio::test]
    async fn ready_entries_resolve_without_loading() {
        let store = store();
        let prefetcher = Prefetcher::new(store.clone());
        let content = Rc::new(SectionContent::new(SectionIndex::new(1), "x", b"{}".to_vec()));
        prefetcher.insert_ready(SectionIndex::new(1), content.clone());

        let taken = prefetcher.take(SectionIndex::new(1)).unwrap().await.unwrap();
        assert!(Rc::ptr_eq(&taken, &content));
        assert!(store.loads().is_empty());
    }

    #[tokio::test]
    async fn failed_prefetch_is_not_counted() {
        let store = store();
        store.fail(1);
        let prefetcher = Prefetcher::new(store.clone());
        prefetcher.ensure(SectionIndex::new(1));
        assert_eq!(prefetcher.drive_idle().await, 0);
        assert!(prefetcher.retain(&[]).is_empty());
    }
}
