//! Pending-tracked mutations of entries and categories.
//!
//! Entry deletion is optimistic: the entry leaves the canonical list before
//! the backend answers and is put back if the call fails. Category rename and
//! delete change derived data only (names and counts), so they are not
//! patched locally; callers refresh after a confirmed change.
//!
//! A confirmed outcome carries the [`PendingGuard`] so the caller decides how
//! long the id stays pending (through the follow-up refresh).

use crate::backend::VaultBackend;
use crate::error::{BackendError, ValidationError};
use crate::fetch::EntryStore;
use crate::models::{CategoryId, EntryId};
use crate::pending::{PendingGuard, PendingSet};
use std::sync::Arc;

/// Per-id lifecycle of an optimistic entry deletion.
#[derive(Debug)]
pub enum EntryDeletion {
    /// A deletion for this id is already in flight; nothing was sent.
    AlreadyPending,
    /// The backend deleted the entry.
    Confirmed(PendingGuard<EntryId>),
    /// The backend refused; the local list was restored.
    RolledBack(BackendError),
}

/// Outcome of a category rename or delete.
#[derive(Debug)]
pub enum CategoryMutation {
    AlreadyPending,
    /// Input rejected locally; the backend was not called.
    Invalid(ValidationError),
    Confirmed(PendingGuard<CategoryId>),
    Failed(BackendError),
}

/// Coordinates optimistic entry deletions.
#[derive(Debug)]
pub struct EntryDeleter<B> {
    backend: Arc<B>,
    store: EntryStore,
    pending: PendingSet<EntryId>,
}

impl<B: VaultBackend> EntryDeleter<B> {
    pub fn new(backend: Arc<B>, store: EntryStore) -> Self {
        Self {
            backend,
            store,
            pending: PendingSet::new(),
        }
    }

    pub fn pending(&self) -> &PendingSet<EntryId> {
        &self.pending
    }

    pub async fn delete(&self, id: &EntryId) -> EntryDeletion {
        let Some(guard) = self.pending.begin(id) else {
            tracing::debug!(%id, "Delete already in flight, ignoring");
            return EntryDeletion::AlreadyPending;
        };

        let removal = self.store.remove_entry(id);

        match self.backend.delete_entry(id).await {
            Ok(()) => {
                tracing::info!(%id, "Entry deleted");
                EntryDeletion::Confirmed(guard)
            }
            Err(err) => {
                tracing::warn!(%id, "Failed to delete entry: {}", err);
                if let Some(removal) = removal {
                    if !self.store.restore_entry(removal) {
                        tracing::debug!(%id, "Entry list was refreshed meanwhile, rollback skipped");
                    }
                }
                EntryDeletion::RolledBack(err)
            }
        }
    }
}

/// Coordinates category renames and deletions.
#[derive(Debug)]
pub struct CategoryEditor<B> {
    backend: Arc<B>,
    deleting: PendingSet<CategoryId>,
    renaming: PendingSet<CategoryId>,
}

impl<B: VaultBackend> CategoryEditor<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            deleting: PendingSet::new(),
            renaming: PendingSet::new(),
        }
    }

    pub fn deleting(&self) -> &PendingSet<CategoryId> {
        &self.deleting
    }

    pub fn renaming(&self) -> &PendingSet<CategoryId> {
        &self.renaming
    }

    /// Rename a category. Blank names are rejected before any backend call;
    /// uniqueness is left to the backend.
    pub async fn rename(&self, id: &CategoryId, new_name: &str) -> CategoryMutation {
        if self.renaming.is_pending(id) {
            tracing::debug!(%id, "Rename already in flight, ignoring");
            return CategoryMutation::AlreadyPending;
        }
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return CategoryMutation::Invalid(ValidationError::EmptyCategoryName);
        }
        let Some(guard) = self.renaming.begin(id) else {
            return CategoryMutation::AlreadyPending;
        };

        match self.backend.rename_category(id, new_name).await {
            Ok(()) => {
                tracing::info!(%id, new_name, "Category renamed");
                CategoryMutation::Confirmed(guard)
            }
            Err(err) => {
                tracing::warn!(%id, "Failed to rename category: {}", err);
                CategoryMutation::Failed(err)
            }
        }
    }

    pub async fn delete(&self, id: &CategoryId) -> CategoryMutation {
        let Some(guard) = self.deleting.begin(id) else {
            tracing::debug!(%id, "Category delete already in flight, ignoring");
            return CategoryMutation::AlreadyPending;
        };

        match self.backend.delete_category(id).await {
            Ok(()) => {
                tracing::info!(%id, "Category deleted");
                CategoryMutation::Confirmed(guard)
            }
            Err(err) => {
                tracing::warn!(%id, "Failed to delete category: {}", err);
                CategoryMutation::Failed(err)
            }
        }
    }
}
