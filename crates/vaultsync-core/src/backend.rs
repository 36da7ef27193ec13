//! The vault backend as seen from the synchronization engine.
//!
//! The engine never sees ciphertext or keys. It issues commands and receives
//! decrypted summaries or a [`BackendError`].

use crate::error::BackendError;
use crate::models::{CategoryCount, CategoryId, EntryId, SearchFilter, SearchResult, VaultStatus};
use std::future::Future;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Asynchronous command surface of the vault.
pub trait VaultBackend: Send + Sync + 'static {
    /// Retrieve entries matching `filter`. An empty filter returns everything.
    fn search_entries(
        &self,
        filter: &SearchFilter,
    ) -> impl Future<Output = BackendResult<SearchResult>> + Send;

    fn delete_entry(&self, id: &EntryId) -> impl Future<Output = BackendResult<()>> + Send;

    /// Remove a category. Entries that belonged to it become uncategorized.
    fn delete_category(&self, id: &CategoryId) -> impl Future<Output = BackendResult<()>> + Send;

    /// Rename a category. The backend rejects duplicate names.
    fn rename_category(
        &self,
        id: &CategoryId,
        new_name: &str,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    fn create_category(&self, name: &str) -> impl Future<Output = BackendResult<CategoryId>> + Send;

    /// Category lookup for autocomplete. An empty query returns all categories.
    fn search_categories(
        &self,
        query: &str,
    ) -> impl Future<Output = BackendResult<Vec<CategoryCount>>> + Send;

    fn vault_status(&self) -> impl Future<Output = BackendResult<VaultStatus>> + Send;
}
