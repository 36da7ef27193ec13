//! The dashboard synchronization context.
//!
//! One [`Dashboard`] exists per mounted session. It owns the search filter,
//! the canonical entry state and the pending trackers, and reacts to a small
//! set of events:
//!
//! - filter changed: schedule a fetch, delayed by the search debounce when
//!   the text changed and immediate otherwise;
//! - mutation succeeded: notify, then refetch with the current filter;
//! - mutation failed: notify (entry deletions are rolled back first).
//!
//! Setters are synchronous but schedule work on the ambient tokio runtime,
//! so they must be called from within one.

use crate::backend::VaultBackend;
use crate::debounce::Debouncer;
use crate::error::SyncError;
use crate::fetch::{EntryFetchEngine, EntryStore, FetchOutcome};
use crate::models::{CategoryCount, CategoryId, EntryId, EntrySummary, SearchFilter, VaultStatus};
use crate::mutation::{CategoryEditor, CategoryMutation, EntryDeleter, EntryDeletion};
use crate::notify::Notification;
use crate::search_params::{FilterChange, SearchParams};
use crate::settings::SyncSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Mutation actions, as reported in [`DashboardEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    DeleteEntry(EntryId),
    DeleteCategory(CategoryId),
    RenameCategory(CategoryId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    FilterChanged(SearchFilter),
    FetchCompleted(FetchOutcome),
    MutationSucceeded(Mutation),
    MutationFailed(Mutation),
    Notification(Notification),
    StatusChanged(VaultStatus),
}

/// What a mutation action did.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationStatus {
    Succeeded,
    /// The id already had a mutation in flight; nothing was sent.
    Skipped,
    Failed(SyncError),
}

impl MutationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationStatus::Succeeded)
    }
}

/// Read-only snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub filter: SearchFilter,
    pub debounced_text: Option<String>,
    /// Newest first.
    pub entries: Vec<EntrySummary>,
    pub total_count: usize,
    pub max_count: usize,
    pub category_distribution: Vec<CategoryCount>,
    pub available_categories: Vec<CategoryCount>,
    pub is_loading: bool,
    pub error: Option<SyncError>,
    pub vault_status: Option<VaultStatus>,
    pub is_deleting_any_entry: bool,
    pub is_deleting_any_category: bool,
    pub is_renaming_any_category: bool,
}

struct Inner<B> {
    backend: Arc<B>,
    settings: SyncSettings,
    params: Mutex<SearchParams>,
    engine: EntryFetchEngine<B>,
    deleter: EntryDeleter<B>,
    categories: CategoryEditor<B>,
    scheduler: Mutex<Debouncer>,
    poller: Mutex<Poller>,
    status: Mutex<Option<VaultStatus>>,
    events: broadcast::Sender<DashboardEvent>,
    unmounted: AtomicBool,
}

/// What a scheduled fetch waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPlan {
    /// Fetch right away.
    Now,
    /// Fetch once typed text has settled.
    AfterTyping,
    /// Fetch right away with the settled text, then again once the text
    /// still being typed has settled.
    NowAndAfterTyping,
}

/// Handle of the status polling task, aborted when dropped.
#[derive(Default)]
struct Poller(Option<JoinHandle<()>>);

impl Poller {
    fn stop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared handle to a mounted dashboard session.
pub struct Dashboard<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Dashboard<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: VaultBackend> Dashboard<B> {
    /// Create the session and start its initial fetch and status polling.
    pub fn mount(backend: Arc<B>, settings: SyncSettings) -> Self {
        let store = EntryStore::new();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            engine: EntryFetchEngine::new(Arc::clone(&backend), store.clone(), settings.loading_delay()),
            deleter: EntryDeleter::new(Arc::clone(&backend), store),
            categories: CategoryEditor::new(Arc::clone(&backend)),
            params: Mutex::new(SearchParams::new(settings.search_debounce())),
            scheduler: Mutex::new(Debouncer::new(settings.search_debounce())),
            poller: Mutex::new(Poller::default()),
            status: Mutex::new(None),
            events,
            unmounted: AtomicBool::new(false),
            backend,
            settings,
        });

        let dashboard = Self { inner };
        tracing::info!("Mounting dashboard");
        dashboard.schedule_fetch(FetchPlan::Now);
        let poller = spawn_status_poller(Arc::downgrade(&dashboard.inner), dashboard.inner.settings.status_poll_interval());
        lock(&dashboard.inner.poller).0 = Some(poller);
        dashboard
    }

    /// Stop scheduled fetches and status polling. Fetches already in flight
    /// run to completion, but nothing new is fetched afterwards, including
    /// the refresh that follows a mutation.
    pub fn unmount(&self) {
        self.inner.unmounted.store(true, Ordering::SeqCst);
        lock(&self.inner.scheduler).cancel();
        lock(&self.inner.poller).stop();
        tracing::info!("Dashboard unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.inner.events.subscribe()
    }

    /// Revision counter of the canonical entry state.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.engine.store().subscribe()
    }

    pub fn filter(&self) -> SearchFilter {
        lock(&self.inner.params).filter().clone()
    }

    pub fn view(&self) -> DashboardView {
        let (filter, debounced_text) = {
            let params = lock(&self.inner.params);
            (params.filter().clone(), params.debounced_text())
        };
        let state = self.inner.engine.store().snapshot();
        DashboardView {
            filter,
            debounced_text,
            entries: state.sorted_entries(),
            total_count: state.total_count,
            max_count: state.max_count,
            category_distribution: state.category_distribution,
            available_categories: state.available_categories,
            is_loading: state.is_loading,
            error: state.error,
            vault_status: *lock(&self.inner.status),
            is_deleting_any_entry: self.is_deleting_any_entry(),
            is_deleting_any_category: self.is_deleting_any_category(),
            is_renaming_any_category: self.is_renaming_any_category(),
        }
    }

    pub fn set_text(&self, text: &str) -> SearchFilter {
        let change = lock(&self.inner.params).set_text(text);
        self.filter_changed(change)
    }

    pub fn set_category_name(&self, name: Option<&str>) -> SearchFilter {
        let change = lock(&self.inner.params).set_category_name(name);
        self.filter_changed(change)
    }

    pub fn set_favorites_only(&self, favorites_only: bool) -> SearchFilter {
        let change = lock(&self.inner.params).set_favorites_only(favorites_only);
        self.filter_changed(change)
    }

    pub fn reset_search(&self) -> SearchFilter {
        let change = lock(&self.inner.params).reset();
        self.filter_changed(change)
    }

    /// Fetch with the current filter now, replacing any scheduled fetch.
    /// A fetch waiting on typed text is kept, since this one does not carry
    /// that text yet. Returns `None` once unmounted.
    pub async fn refresh_entries(&self) -> Option<FetchOutcome> {
        if !self.inner.is_mounted() {
            return None;
        }
        if !lock(&self.inner.params).is_text_settling() {
            lock(&self.inner.scheduler).cancel();
        }
        Some(self.inner.fetch_current().await)
    }

    pub fn is_deleting_entry(&self, id: &EntryId) -> bool {
        self.inner.deleter.pending().is_pending(id)
    }

    pub fn is_deleting_category(&self, id: &CategoryId) -> bool {
        self.inner.categories.deleting().is_pending(id)
    }

    pub fn is_renaming_category(&self, id: &CategoryId) -> bool {
        self.inner.categories.renaming().is_pending(id)
    }

    pub fn is_deleting_any_entry(&self) -> bool {
        self.inner.deleter.pending().any_pending()
    }

    pub fn is_deleting_any_category(&self) -> bool {
        self.inner.categories.deleting().any_pending()
    }

    pub fn is_renaming_any_category(&self) -> bool {
        self.inner.categories.renaming().any_pending()
    }

    pub async fn delete_entry(&self, id: &EntryId) -> MutationStatus {
        match self.inner.deleter.delete(id).await {
            EntryDeletion::AlreadyPending => MutationStatus::Skipped,
            EntryDeletion::Confirmed(_guard) => {
                self.inner.notify(Notification::entry_deleted());
                self.inner.emit(DashboardEvent::MutationSucceeded(Mutation::DeleteEntry(id.clone())));
                self.refresh_entries().await;
                MutationStatus::Succeeded
            }
            EntryDeletion::RolledBack(err) => {
                self.inner.notify(Notification::entry_delete_failed());
                self.inner.emit(DashboardEvent::MutationFailed(Mutation::DeleteEntry(id.clone())));
                MutationStatus::Failed(err.into())
            }
        }
    }

    /// Delete a category. When it is the active filter category, the filter
    /// is cleared before the refetch.
    pub async fn delete_category(&self, id: &CategoryId) -> MutationStatus {
        let name = self.category_name(id);
        match self.inner.categories.delete(id).await {
            CategoryMutation::AlreadyPending => MutationStatus::Skipped,
            CategoryMutation::Invalid(err) => MutationStatus::Failed(err.into()),
            CategoryMutation::Confirmed(_guard) => {
                let filter_reset = match name {
                    Some(name) if self.is_active_category(&name) => {
                        let change = lock(&self.inner.params).clear_category();
                        self.inner.emit(DashboardEvent::FilterChanged(change.current));
                        true
                    }
                    _ => false,
                };
                self.inner.notify(Notification::category_deleted(filter_reset));
                self.inner.emit(DashboardEvent::MutationSucceeded(Mutation::DeleteCategory(id.clone())));
                self.refresh_entries().await;
                MutationStatus::Succeeded
            }
            CategoryMutation::Failed(err) => {
                self.inner.notify(Notification::category_delete_failed());
                self.inner.emit(DashboardEvent::MutationFailed(Mutation::DeleteCategory(id.clone())));
                MutationStatus::Failed(err.into())
            }
        }
    }

    /// Rename a category. A blank name is rejected without a backend call.
    /// When it is the active filter category, the filter follows the rename.
    pub async fn rename_category(&self, id: &CategoryId, new_name: &str) -> MutationStatus {
        let old_name = self.category_name(id);
        match self.inner.categories.rename(id, new_name).await {
            CategoryMutation::AlreadyPending => MutationStatus::Skipped,
            CategoryMutation::Invalid(err) => {
                self.inner.notify(Notification::invalid_name());
                MutationStatus::Failed(err.into())
            }
            CategoryMutation::Confirmed(_guard) => {
                if let Some(old_name) = old_name {
                    if self.is_active_category(&old_name) {
                        let change = lock(&self.inner.params).replace_category_name(new_name.trim());
                        self.inner.emit(DashboardEvent::FilterChanged(change.current));
                    }
                }
                self.inner.notify(Notification::category_renamed());
                self.inner.emit(DashboardEvent::MutationSucceeded(Mutation::RenameCategory(id.clone())));
                self.refresh_entries().await;
                MutationStatus::Succeeded
            }
            CategoryMutation::Failed(err) => {
                self.inner.notify(Notification::rename_failed(&err));
                self.inner.emit(DashboardEvent::MutationFailed(Mutation::RenameCategory(id.clone())));
                MutationStatus::Failed(err.into())
            }
        }
    }

    fn filter_changed(&self, change: FilterChange) -> SearchFilter {
        if change.is_noop() {
            return change.current;
        }
        self.inner.emit(DashboardEvent::FilterChanged(change.current.clone()));
        let plan = if !change.discrete_changed() {
            FetchPlan::AfterTyping
        } else if lock(&self.inner.params).is_text_settling() {
            FetchPlan::NowAndAfterTyping
        } else {
            FetchPlan::Now
        };
        self.schedule_fetch(plan);
        change.current
    }

    /// Replace the scheduled fetch. The fetch reads the filter when it
    /// starts and runs detached from the timer, so a later cancel only stops
    /// fetches that have not started. A fetch after typing settles the text
    /// first, so it never races the text's own timer.
    fn schedule_fetch(&self, plan: FetchPlan) {
        if !self.inner.is_mounted() {
            return;
        }
        tracing::debug!(?plan, "Scheduling fetch");
        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.settings.search_debounce();
        lock(&self.inner.scheduler).call_after(Duration::ZERO, async move {
            if plan != FetchPlan::AfterTyping {
                spawn_fetch(&weak);
            }
            if plan != FetchPlan::Now {
                tokio::time::sleep(debounce).await;
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.params).flush_text();
                }
                spawn_fetch(&weak);
            }
        });
    }

    fn category_name(&self, id: &CategoryId) -> Option<String> {
        let state = self.inner.engine.store().snapshot();
        state
            .available_categories
            .iter()
            .chain(state.category_distribution.iter())
            .find(|c| &c.id == id)
            .map(|c| c.name.clone())
    }

    fn is_active_category(&self, name: &str) -> bool {
        lock(&self.inner.params)
            .filter()
            .category_name
            .as_deref()
            .is_some_and(|active| active.to_lowercase() == name.to_lowercase())
    }
}

impl<B: VaultBackend> Inner<B> {
    fn is_mounted(&self) -> bool {
        !self.unmounted.load(Ordering::SeqCst)
    }

    async fn fetch_current(&self) -> FetchOutcome {
        let filter = lock(&self.params).fetch_filter();
        let outcome = self.engine.fetch(filter).await;
        self.emit(DashboardEvent::FetchCompleted(outcome.clone()));
        outcome
    }

    async fn poll_status(&self) {
        match self.backend.vault_status().await {
            Ok(status) => {
                let changed = lock(&self.status).replace(status) != Some(status);
                if changed {
                    tracing::debug!(?status, "Vault status changed");
                    self.emit(DashboardEvent::StatusChanged(status));
                }
            }
            Err(err) => tracing::warn!("Failed to poll vault status: {}", err),
        }
    }

    fn notify(&self, notification: Notification) {
        self.emit(DashboardEvent::Notification(notification));
    }

    fn emit(&self, event: DashboardEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn spawn_fetch<B: VaultBackend>(inner: &Weak<Inner<B>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if !inner.is_mounted() {
        return;
    }
    tokio::spawn(async move {
        inner.fetch_current().await;
    });
}

fn spawn_status_poller<B: VaultBackend>(
    inner: Weak<Inner<B>>,
    interval: Option<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(strong) = inner.upgrade() else {
                break;
            };
            strong.poll_status().await;
            drop(strong);
            match interval {
                Some(interval) => tokio::time::sleep(interval).await,
                None => break,
            }
        }
    })
}
