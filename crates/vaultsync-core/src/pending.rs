//! Tracking of identifiers with an in-flight mutation.
//!
//! `begin` hands out a [`PendingGuard`]; the id leaves the set when the guard
//! is dropped, on every path out of the mutation.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared set of ids currently undergoing a mutation.
pub struct PendingSet<Id> {
    ids: Arc<Mutex<HashSet<Id>>>,
}

impl<Id> PendingSet<Id>
where
    Id: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            ids: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Mark `id` as pending.
    ///
    /// Returns `None` when `id` is already pending; the caller must not start
    /// a second backend call in that case.
    pub fn begin(&self, id: &Id) -> Option<PendingGuard<Id>> {
        if !self.lock().insert(id.clone()) {
            return None;
        }
        Some(PendingGuard {
            id: id.clone(),
            ids: Arc::clone(&self.ids),
        })
    }

    pub fn is_pending(&self, id: &Id) -> bool {
        self.lock().contains(id)
    }

    pub fn any_pending(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Id>> {
        // The set holds plain ids, so a poisoned lock still has usable data.
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<Id> Default for PendingSet<Id>
where
    Id: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> Clone for PendingSet<Id> {
    fn clone(&self) -> Self {
        Self {
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<Id: fmt::Debug> fmt::Debug for PendingSet<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSet").field("ids", &self.ids).finish()
    }
}

/// Membership of one id in a [`PendingSet`]. Dropping it ends the operation.
#[must_use = "dropping the guard immediately ends the pending operation"]
pub struct PendingGuard<Id>
where
    Id: Eq + Hash,
{
    id: Id,
    ids: Arc<Mutex<HashSet<Id>>>,
}

impl<Id> PendingGuard<Id>
where
    Id: Eq + Hash,
{
    pub fn id(&self) -> &Id {
        &self.id
    }
}

impl<Id> Drop for PendingGuard<Id>
where
    Id: Eq + Hash,
{
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.id);
    }
}

impl<Id> fmt::Debug for PendingGuard<Id>
where
    Id: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingGuard").field("id", &self.id).finish()
    }
}
