//! Shared data types for the synchronization engine.
//!
//! Field names serialize in camelCase, matching the payloads exchanged with
//! the vault backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vault entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

/// Identifier of a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

impl_id!(EntryId);
impl_id!(CategoryId);

/// The filter driving entry retrieval.
///
/// `text` and `category_name` are either absent or non-empty. Instances are
/// only produced by [`crate::SearchParams`] setters, never assigned field by
/// field from the outside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub favorites_only: bool,
}

impl SearchFilter {
    /// True when no constraint at all is active.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.category_name.is_none() && !self.favorites_only
    }

    /// True when the filter is scoped to a single category.
    pub fn has_category(&self) -> bool {
        self.category_name.is_some()
    }
}

/// Decrypted summary of an entry, as shown in the dashboard list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: EntryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category and how many entries it holds under some filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub id: CategoryId,
    pub name: String,
    pub entry_count: usize,
}

/// Response of a backend search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entries: Vec<EntrySummary>,
    /// Entries matching the full filter.
    pub total_count: usize,
    /// Entries in the vault with no filter applied.
    pub max_count: usize,
    /// Matching entries grouped by category.
    pub category_distribution: Vec<CategoryCount>,
}

/// Session health reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStatus {
    pub session_active: bool,
    pub key_hierarchy_present: bool,
    pub vault_manager_present: bool,
}

impl VaultStatus {
    pub fn is_unlocked(&self) -> bool {
        self.session_active && self.key_hierarchy_present && self.vault_manager_present
    }
}

/// Sort entries by `updated_at` descending.
///
/// The sort is stable, so entries sharing a timestamp keep the relative order
/// the backend returned them in.
pub fn sort_by_recency(entries: &mut [EntrySummary]) {
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}
