//! Client-side synchronization engine for vaultsync.
//!
//! This crate keeps a list of vault entries and their category counts
//! consistent with an asynchronous backend while the frontend searches,
//! deletes and edits categories. Frontends mount a [`Dashboard`] over any
//! [`VaultBackend`] and render its [`DashboardView`].

pub mod backend;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod models;
pub mod mutation;
pub mod notify;
pub mod pending;
pub mod search_params;
pub mod settings;

pub use backend::{BackendResult, VaultBackend};
pub use dashboard::{Dashboard, DashboardEvent, DashboardView, Mutation, MutationStatus};
pub use error::{BackendError, ErrorKind, SyncError, ValidationError};
pub use fetch::{EntryState, FetchOutcome};
pub use memory::{MemoryBackend, SeedVault};
pub use models::{CategoryCount, CategoryId, EntryId, EntrySummary, SearchFilter, SearchResult, VaultStatus};
pub use notify::{Notification, NotificationKind};
pub use search_params::SearchParams;
pub use settings::SyncSettings;
