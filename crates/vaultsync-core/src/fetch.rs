//! Canonical entry state and the engine that refreshes it from the backend.
//!
//! Writers are limited to [`EntryFetchEngine`] (fetch resolution) and the
//! optimistic entry deletion in [`crate::mutation`] (patch and rollback).
//! Every write bumps a revision that observers can wait on.

use crate::backend::{BackendResult, VaultBackend};
use crate::error::{BackendError, SyncError};
use crate::models::{sort_by_recency, CategoryCount, EntryId, EntrySummary, SearchFilter, SearchResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Delay before a running fetch is allowed to show a loading indicator.
pub const DEFAULT_LOADING_DELAY: Duration = Duration::from_millis(150);

/// Entry and category data as last confirmed by the backend, plus
/// optimistic patches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryState {
    /// Entries in backend order. Use [`EntryState::sorted_entries`] for display.
    pub entries: Vec<EntrySummary>,
    pub total_count: usize,
    pub max_count: usize,
    /// Category counts under the filter of the last fetch.
    pub category_distribution: Vec<CategoryCount>,
    /// Category counts from the last fetch without a category constraint.
    pub available_categories: Vec<CategoryCount>,
    pub is_loading: bool,
    pub error: Option<SyncError>,
}

impl EntryState {
    /// Entries newest first, ties kept in backend order.
    pub fn sorted_entries(&self) -> Vec<EntrySummary> {
        let mut entries = self.entries.clone();
        sort_by_recency(&mut entries);
        entries
    }
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result replaced the canonical state.
    Applied,
    /// The backend failed; prior entries stay visible.
    Failed(BackendError),
    /// A newer fetch started first; the result was dropped.
    Superseded,
}

/// An entry taken out of the list by an optimistic patch.
#[derive(Debug, Clone)]
pub(crate) struct Removal {
    entry: EntrySummary,
    index: usize,
    fetches_applied: u64,
}

#[derive(Debug, Default)]
struct StoreInner {
    state: EntryState,
    /// Generation of the most recently started fetch.
    latest_fetch: u64,
    /// Number of fetch results written so far.
    fetches_applied: u64,
}

/// Shared handle to the canonical entry state.
#[derive(Debug, Clone)]
pub struct EntryStore {
    inner: Arc<Mutex<StoreInner>>,
    revision: Arc<watch::Sender<u64>>,
}

impl EntryStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            revision: Arc::new(revision),
        }
    }

    pub fn snapshot(&self) -> EntryState {
        self.lock().state.clone()
    }

    /// Receiver that changes on every write to the state.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn begin_fetch(&self) -> u64 {
        let mut inner = self.lock();
        inner.latest_fetch += 1;
        inner.latest_fetch
    }

    fn show_loading(&self, generation: u64) {
        let changed = {
            let mut inner = self.lock();
            if inner.latest_fetch == generation && !inner.state.is_loading {
                inner.state.is_loading = true;
                true
            } else {
                false
            }
        };
        if changed {
            self.bump();
        }
    }

    fn complete_fetch(
        &self,
        generation: u64,
        filter: &SearchFilter,
        result: BackendResult<SearchResult>,
    ) -> FetchOutcome {
        let outcome = {
            let mut inner = self.lock();
            if inner.latest_fetch != generation {
                return FetchOutcome::Superseded;
            }
            let state = &mut inner.state;
            state.is_loading = false;
            match result {
                Ok(result) => {
                    if !filter.has_category() {
                        state.available_categories = result.category_distribution.clone();
                    }
                    state.entries = result.entries;
                    state.total_count = result.total_count;
                    state.max_count = result.max_count;
                    state.category_distribution = result.category_distribution;
                    state.error = None;
                    inner.fetches_applied += 1;
                    FetchOutcome::Applied
                }
                Err(err) => {
                    state.error = Some(SyncError::Backend(err.clone()));
                    FetchOutcome::Failed(err)
                }
            }
        };
        self.bump();
        outcome
    }

    /// Optimistically drop an entry from the list.
    pub(crate) fn remove_entry(&self, id: &EntryId) -> Option<Removal> {
        let removal = {
            let mut inner = self.lock();
            let fetches_applied = inner.fetches_applied;
            let state = &mut inner.state;
            let index = state.entries.iter().position(|entry| &entry.id == id)?;
            let entry = state.entries.remove(index);
            state.total_count = state.total_count.saturating_sub(1);
            Removal {
                entry,
                index,
                fetches_applied,
            }
        };
        self.bump();
        Some(removal)
    }

    /// Undo [`EntryStore::remove_entry`].
    ///
    /// Skipped when a fetch result landed in the meantime, since that result
    /// already reflects the backend. Returns whether the entry was restored.
    pub(crate) fn restore_entry(&self, removal: Removal) -> bool {
        let restored = {
            let mut inner = self.lock();
            if inner.fetches_applied != removal.fetches_applied {
                false
            } else if inner.state.entries.iter().any(|e| e.id == removal.entry.id) {
                false
            } else {
                let state = &mut inner.state;
                let index = removal.index.min(state.entries.len());
                state.entries.insert(index, removal.entry);
                state.total_count += 1;
                true
            }
        };
        if restored {
            self.bump();
        }
        restored
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Retrieves entries for a filter and writes them into an [`EntryStore`].
#[derive(Debug)]
pub struct EntryFetchEngine<B> {
    backend: Arc<B>,
    store: EntryStore,
    loading_delay: Duration,
}

impl<B: VaultBackend> EntryFetchEngine<B> {
    pub fn new(backend: Arc<B>, store: EntryStore, loading_delay: Duration) -> Self {
        Self {
            backend,
            store,
            loading_delay,
        }
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Fetch entries for `filter`.
    ///
    /// The loading flag is raised only if the backend has not answered within
    /// the loading delay. A result that arrives after a newer fetch started is
    /// discarded.
    pub async fn fetch(&self, filter: SearchFilter) -> FetchOutcome {
        let generation = self.store.begin_fetch();
        tracing::debug!(generation, ?filter, "Fetching entries");

        let search = self.backend.search_entries(&filter);
        tokio::pin!(search);
        let result = tokio::select! {
            biased;
            result = &mut search => result,
            _ = tokio::time::sleep(self.loading_delay) => {
                self.store.show_loading(generation);
                search.await
            }
        };

        let outcome = self.store.complete_fetch(generation, &filter, result);
        match &outcome {
            FetchOutcome::Applied => tracing::debug!(generation, "Fetch applied"),
            FetchOutcome::Superseded => {
                tracing::debug!(generation, "Discarding result of superseded fetch")
            }
            FetchOutcome::Failed(err) => {
                tracing::warn!(generation, "Failed to fetch entries: {}", err)
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, NewEntry, Operation};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::sleep;

    fn seeded() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::new();
        let work = backend.insert_category("Work");
        let home = backend.insert_category("Home");
        backend.insert_entry(NewEntry::new("GitLab").category(&work).favorite(true).minutes_ago(5));
        backend.insert_entry(NewEntry::new("Jira").category(&work).minutes_ago(1));
        backend.insert_entry(NewEntry::new("Router").category(&home).minutes_ago(30));
        Arc::new(backend)
    }

    fn engine(backend: &Arc<MemoryBackend>) -> EntryFetchEngine<MemoryBackend> {
        EntryFetchEngine::new(Arc::clone(backend), EntryStore::new(), DEFAULT_LOADING_DELAY)
    }

    fn filter_for(category: Option<&str>) -> SearchFilter {
        SearchFilter {
            category_name: category.map(str::to_string),
            ..SearchFilter::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unfiltered_fetch_refreshes_available_categories() {
        let backend = seeded();
        let engine = engine(&backend);

        assert_eq!(engine.fetch(SearchFilter::default()).await, FetchOutcome::Applied);
        let state = engine.store().snapshot();
        assert_eq!(state.total_count, 3);
        assert_eq!(state.max_count, 3);
        assert_eq!(state.available_categories, state.category_distribution);
        let names: Vec<_> = state.available_categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Home", "Work"]);
    }

    #[tokio::test(start_paused = true)]
    async fn category_fetch_keeps_previous_available_categories() {
        let backend = seeded();
        let engine = engine(&backend);
        engine.fetch(SearchFilter::default()).await;
        let before = engine.store().snapshot().available_categories;

        assert_eq!(engine.fetch(filter_for(Some("Work"))).await, FetchOutcome::Applied);
        let state = engine.store().snapshot();
        assert_eq!(state.available_categories, before);
        assert_eq!(state.category_distribution.len(), 1);
        assert_eq!(state.total_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn max_count_ignores_the_filter() {
        let backend = seeded();
        let engine = engine(&backend);
        let filters = [
            SearchFilter::default(),
            filter_for(Some("Home")),
            SearchFilter {
                text: Some("jira".into()),
                ..SearchFilter::default()
            },
            SearchFilter {
                favorites_only: true,
                ..SearchFilter::default()
            },
        ];
        for filter in filters {
            engine.fetch(filter).await;
            assert_eq!(engine.store().snapshot().max_count, 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sorted_entries_are_newest_first() {
        let backend = seeded();
        let engine = engine(&backend);
        engine.fetch(SearchFilter::default()).await;
        let titles: Vec<_> = engine
            .store()
            .snapshot()
            .sorted_entries()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["Jira", "GitLab", "Router"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_fetch_never_shows_loading() {
        let backend = seeded();
        backend.set_latency(Operation::SearchEntries, Duration::from_millis(50));
        let engine = Arc::new(engine(&backend));

        let saw_loading = Arc::new(AtomicBool::new(false));
        let mut revisions = engine.store().subscribe();
        let watcher = {
            let engine = Arc::clone(&engine);
            let saw_loading = Arc::clone(&saw_loading);
            tokio::spawn(async move {
                while revisions.changed().await.is_ok() {
                    if engine.store().snapshot().is_loading {
                        saw_loading.store(true, Ordering::SeqCst);
                    }
                }
            })
        };

        assert_eq!(engine.fetch(SearchFilter::default()).await, FetchOutcome::Applied);
        sleep(Duration::from_millis(500)).await;
        assert!(!saw_loading.load(Ordering::SeqCst));
        assert!(!engine.store().snapshot().is_loading);
        watcher.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_shows_loading_until_it_resolves() {
        let backend = seeded();
        backend.set_latency(Operation::SearchEntries, Duration::from_millis(400));
        let engine = Arc::new(engine(&backend));

        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.fetch(SearchFilter::default()).await })
        };
        sleep(Duration::from_millis(100)).await;
        assert!(!engine.store().snapshot().is_loading);
        sleep(Duration::from_millis(100)).await;
        assert!(engine.store().snapshot().is_loading);

        assert_eq!(task.await.unwrap(), FetchOutcome::Applied);
        assert!(!engine.store().snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_entries_and_records_error() {
        let backend = seeded();
        let engine = engine(&backend);
        engine.fetch(SearchFilter::default()).await;

        backend.fail_next(Operation::SearchEntries, BackendError::operation_failed("io"));
        let outcome = engine.fetch(filter_for(Some("Work"))).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));

        let state = engine.store().snapshot();
        assert_eq!(state.entries.len(), 3);
        assert!(!state.is_loading);
        assert_eq!(
            state.error,
            Some(SyncError::Backend(BackendError::operation_failed("io")))
        );

        engine.fetch(SearchFilter::default()).await;
        assert_eq!(engine.store().snapshot().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_does_not_overwrite_newer_fetch() {
        let backend = seeded();
        let engine = Arc::new(engine(&backend));

        backend.delay_next(Operation::SearchEntries, Duration::from_millis(500));
        let slow = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.fetch(SearchFilter::default()).await })
        };
        sleep(Duration::from_millis(10)).await;

        let fast = engine.fetch(filter_for(Some("Home"))).await;
        assert_eq!(fast, FetchOutcome::Applied);
        assert_eq!(slow.await.unwrap(), FetchOutcome::Superseded);

        let state = engine.store().snapshot();
        assert_eq!(state.total_count, 1);
        assert_eq!(state.entries[0].title, "Router");
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_is_skipped_after_a_newer_fetch() {
        let backend = seeded();
        let engine = engine(&backend);
        engine.fetch(SearchFilter::default()).await;
        let id = engine.store().snapshot().entries[0].id.clone();

        let removal = engine.store().remove_entry(&id).unwrap();
        engine.fetch(filter_for(Some("Home"))).await;
        assert!(!engine.store().restore_entry(removal));
        assert_eq!(engine.store().snapshot().total_count, 1);
    }
}
