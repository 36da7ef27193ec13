//! In-memory vault backend.
//!
//! Used by the terminal dashboard as a stand-in vault and by the tests as a
//! scriptable double: per-operation latency, one-shot delays and failures,
//! call counters and a lock switch.

use crate::backend::{BackendResult, VaultBackend};
use crate::error::BackendError;
use crate::models::{
    CategoryCount, CategoryId, EntryId, EntrySummary, SearchFilter, SearchResult, VaultStatus,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Backend operations, used to address the test hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SearchEntries,
    DeleteEntry,
    DeleteCategory,
    RenameCategory,
    CreateCategory,
    SearchCategories,
    VaultStatus,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::SearchEntries,
        Operation::DeleteEntry,
        Operation::DeleteCategory,
        Operation::RenameCategory,
        Operation::CreateCategory,
        Operation::SearchCategories,
        Operation::VaultStatus,
    ];
}

#[derive(Debug, Default)]
struct Script {
    latency: Duration,
    delays: VecDeque<Duration>,
    failures: VecDeque<BackendError>,
    calls: usize,
}

#[derive(Debug, Clone)]
struct StoredCategory {
    id: CategoryId,
    name: String,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    id: EntryId,
    title: String,
    username: Option<String>,
    url: Option<String>,
    category_id: Option<CategoryId>,
    favorite: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredEntry {
    fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [Some(&self.title), self.username.as_ref(), self.url.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Default)]
struct Vault {
    categories: Vec<StoredCategory>,
    entries: Vec<StoredEntry>,
}

impl Vault {
    fn category(&self, id: &CategoryId) -> Option<&StoredCategory> {
        self.categories.iter().find(|c| &c.id == id)
    }

    fn category_by_name(&self, name: &str) -> Option<&StoredCategory> {
        let name = name.to_lowercase();
        self.categories.iter().find(|c| c.name.to_lowercase() == name)
    }

    /// Validate a category name, returning it trimmed.
    fn check_name<'a>(&self, name: &'a str, skip: Option<&CategoryId>) -> BackendResult<&'a str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BackendError::invalid_category_name(name));
        }
        match self.category_by_name(trimmed) {
            Some(existing) if Some(&existing.id) != skip => {
                Err(BackendError::duplicate_category_name(trimmed))
            }
            _ => Ok(trimmed),
        }
    }

    fn summary(&self, entry: &StoredEntry) -> EntrySummary {
        let category_name = entry
            .category_id
            .as_ref()
            .and_then(|id| self.category(id))
            .map(|c| c.name.clone());
        EntrySummary {
            id: entry.id.clone(),
            title: entry.title.clone(),
            username: entry.username.clone(),
            url: entry.url.clone(),
            category_id: entry.category_id.clone(),
            category_name,
            favorite: entry.favorite,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }

    fn search(&self, filter: &SearchFilter) -> SearchResult {
        let category = match &filter.category_name {
            Some(name) => match self.category_by_name(name) {
                Some(category) => Some(&category.id),
                None => {
                    return SearchResult {
                        max_count: self.entries.len(),
                        ..SearchResult::default()
                    }
                }
            },
            None => None,
        };

        let matched: Vec<&StoredEntry> = self
            .entries
            .iter()
            .filter(|e| !filter.favorites_only || e.favorite)
            .filter(|e| category.is_none() || e.category_id.as_ref() == category)
            .filter(|e| filter.text.as_deref().map_or(true, |t| e.matches_text(t)))
            .collect();

        let mut counts: HashMap<&CategoryId, usize> = HashMap::new();
        for entry in &matched {
            if let Some(id) = &entry.category_id {
                *counts.entry(id).or_default() += 1;
            }
        }
        let mut distribution: Vec<CategoryCount> = self
            .categories
            .iter()
            .filter_map(|c| {
                counts.get(&c.id).map(|&entry_count| CategoryCount {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    entry_count,
                })
            })
            .collect();
        distribution.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        SearchResult {
            entries: matched.iter().map(|e| self.summary(e)).collect(),
            total_count: matched.len(),
            max_count: self.entries.len(),
            category_distribution: distribution,
        }
    }
}

/// Builder for entries inserted directly into a [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct NewEntry {
    title: String,
    username: Option<String>,
    url: Option<String>,
    category: Option<CategoryId>,
    favorite: bool,
    age: ChronoDuration,
}

impl NewEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            username: None,
            url: None,
            category: None,
            favorite: false,
            age: ChronoDuration::zero(),
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn category(mut self, id: &CategoryId) -> Self {
        self.category = Some(id.clone());
        self
    }

    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// Backdate the entry's timestamps.
    pub fn minutes_ago(mut self, minutes: i64) -> Self {
        self.age = ChronoDuration::minutes(minutes);
        self
    }
}

/// A vault held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    vault: Mutex<Vault>,
    scripts: Mutex<HashMap<Operation, Script>>,
    locked: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend holding the contents of a seed.
    pub fn from_seed(seed: &SeedVault) -> Self {
        let backend = Self::new();
        for category in &seed.categories {
            backend.insert_category(&category.name);
        }
        for entry in &seed.entries {
            let mut new = NewEntry::new(entry.title.clone())
                .favorite(entry.favorite)
                .minutes_ago(entry.updated_minutes_ago);
            new.username = entry.username.clone();
            new.url = entry.url.clone();
            if let Some(name) = &entry.category {
                new.category = Some(backend.insert_category(name));
            }
            backend.insert_entry(new);
        }
        backend
    }

    /// Add a category, or return the id of the one already using `name`.
    pub fn insert_category(&self, name: &str) -> CategoryId {
        let mut vault = self.vault();
        if let Some(existing) = vault.category_by_name(name.trim()) {
            return existing.id.clone();
        }
        let id = CategoryId::random();
        vault.categories.push(StoredCategory {
            id: id.clone(),
            name: name.trim().to_string(),
        });
        id
    }

    pub fn insert_entry(&self, entry: NewEntry) -> EntryId {
        let id = EntryId::random();
        let stamp = Utc::now() - entry.age;
        self.vault().entries.push(StoredEntry {
            id: id.clone(),
            title: entry.title,
            username: entry.username,
            url: entry.url,
            category_id: entry.category,
            favorite: entry.favorite,
            created_at: stamp,
            updated_at: stamp,
        });
        id
    }

    pub fn entry_count(&self) -> usize {
        self.vault().entries.len()
    }

    pub fn category_name(&self, id: &CategoryId) -> Option<String> {
        self.vault().category(id).map(|c| c.name.clone())
    }

    /// Latency applied to every call of `op`.
    pub fn set_latency(&self, op: Operation, latency: Duration) {
        self.script(op, |s| s.latency = latency);
    }

    pub fn set_latency_all(&self, latency: Duration) {
        for op in Operation::ALL {
            self.set_latency(op, latency);
        }
    }

    /// Replace the latency of the next call of `op` only.
    pub fn delay_next(&self, op: Operation, delay: Duration) {
        self.script(op, |s| s.delays.push_back(delay));
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: BackendError) {
        self.script(op, |s| s.failures.push_back(error));
    }

    /// Number of calls of `op` received so far, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.scripts().get(&op).map_or(0, |s| s.calls)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    fn vault(&self) -> MutexGuard<'_, Vault> {
        self.vault.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn scripts(&self) -> MutexGuard<'_, HashMap<Operation, Script>> {
        self.scripts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn script(&self, op: Operation, update: impl FnOnce(&mut Script)) {
        update(self.scripts().entry(op).or_default());
    }

    /// Count the call, wait out its latency and apply scripted failures.
    async fn enter(&self, op: Operation) -> BackendResult<()> {
        let (delay, failure) = {
            let mut scripts = self.scripts();
            let script = scripts.entry(op).or_default();
            script.calls += 1;
            let delay = script.delays.pop_front().unwrap_or(script.latency);
            (delay, script.failures.pop_front())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        if op != Operation::VaultStatus && self.is_locked() {
            return Err(BackendError::vault_locked());
        }
        Ok(())
    }
}

impl VaultBackend for MemoryBackend {
    async fn search_entries(&self, filter: &SearchFilter) -> BackendResult<SearchResult> {
        self.enter(Operation::SearchEntries).await?;
        Ok(self.vault().search(filter))
    }

    async fn delete_entry(&self, id: &EntryId) -> BackendResult<()> {
        self.enter(Operation::DeleteEntry).await?;
        let mut vault = self.vault();
        let index = vault
            .entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| BackendError::entry_not_found(id))?;
        vault.entries.remove(index);
        Ok(())
    }

    async fn delete_category(&self, id: &CategoryId) -> BackendResult<()> {
        self.enter(Operation::DeleteCategory).await?;
        let mut vault = self.vault();
        let index = vault
            .categories
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| BackendError::category_not_found(id))?;
        vault.categories.remove(index);
        for entry in vault.entries.iter_mut() {
            if entry.category_id.as_ref() == Some(id) {
                entry.category_id = None;
            }
        }
        Ok(())
    }

    async fn rename_category(&self, id: &CategoryId, new_name: &str) -> BackendResult<()> {
        self.enter(Operation::RenameCategory).await?;
        let mut vault = self.vault();
        if vault.category(id).is_none() {
            return Err(BackendError::category_not_found(id));
        }
        let name = vault.check_name(new_name, Some(id))?.to_string();
        if let Some(category) = vault.categories.iter_mut().find(|c| &c.id == id) {
            category.name = name;
        }
        Ok(())
    }

    async fn create_category(&self, name: &str) -> BackendResult<CategoryId> {
        self.enter(Operation::CreateCategory).await?;
        let mut vault = self.vault();
        let name = vault.check_name(name, None)?.to_string();
        let id = CategoryId::random();
        vault.categories.push(StoredCategory {
            id: id.clone(),
            name,
        });
        Ok(id)
    }

    async fn search_categories(&self, query: &str) -> BackendResult<Vec<CategoryCount>> {
        self.enter(Operation::SearchCategories).await?;
        let vault = self.vault();
        let query = query.trim().to_lowercase();
        let mut found: Vec<CategoryCount> = vault
            .categories
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&query))
            .map(|c| CategoryCount {
                id: c.id.clone(),
                name: c.name.clone(),
                entry_count: vault
                    .entries
                    .iter()
                    .filter(|e| e.category_id.as_ref() == Some(&c.id))
                    .count(),
            })
            .collect();
        found.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(found)
    }

    async fn vault_status(&self) -> BackendResult<VaultStatus> {
        self.enter(Operation::VaultStatus).await?;
        let unlocked = !self.is_locked();
        Ok(VaultStatus {
            session_active: unlocked,
            key_hierarchy_present: true,
            vault_manager_present: unlocked,
        })
    }
}

/// Serialized starting contents of a [`MemoryBackend`].
///
/// ```toml
/// [[categories]]
/// name = "Work"
///
/// [[entries]]
/// title = "GitLab"
/// username = "dev@example.com"
/// category = "Work"
/// favorite = true
/// updated_minutes_ago = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedVault {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub entries: Vec<SeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCategory {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Category name; created on load when missing from `categories`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub updated_minutes_ago: i64,
}

impl SeedVault {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The vault the dashboard starts with when no seed file is configured.
    pub fn demo() -> Self {
        let entry = |title: &str, username: &str, url: &str, category: Option<&str>, favorite: bool, age: i64| {
            SeedEntry {
                title: title.to_string(),
                username: Some(username.to_string()),
                url: Some(url.to_string()),
                category: category.map(str::to_string),
                favorite,
                updated_minutes_ago: age,
            }
        };
        Self {
            categories: ["Work", "Personal", "Finance", "Archive"]
                .into_iter()
                .map(|name| SeedCategory {
                    name: name.to_string(),
                })
                .collect(),
            entries: vec![
                entry("GitLab", "dev@example.com", "https://gitlab.example.com", Some("Work"), true, 12),
                entry("Jira", "dev@example.com", "https://jira.example.com", Some("Work"), false, 95),
                entry("Company VPN", "jdoe", "vpn.example.com", Some("Work"), false, 2_880),
                entry("Mail", "jdoe@mail.example", "https://mail.example", Some("Personal"), true, 3),
                entry("Home Router", "admin", "http://192.168.1.1", Some("Personal"), false, 20_160),
                entry("Bank", "jdoe", "https://bank.example", Some("Finance"), true, 600),
                entry("Brokerage", "jdoe", "https://broker.example", Some("Finance"), false, 7_200),
                entry("Forum", "jd", "https://forum.example.org", None, false, 43_200),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    fn seeded() -> (MemoryBackend, CategoryId, CategoryId) {
        let backend = MemoryBackend::new();
        let work = backend.insert_category("Work");
        let home = backend.insert_category("Home");
        backend.insert_entry(
            NewEntry::new("GitLab")
                .username("dev")
                .url("https://gitlab.example.com")
                .category(&work)
                .favorite(true),
        );
        backend.insert_entry(NewEntry::new("Jira").category(&work));
        backend.insert_entry(NewEntry::new("Router").username("admin").category(&home));
        backend.insert_entry(NewEntry::new("Loose"));
        (backend, work, home)
    }

    fn titles(result: &SearchResult) -> Vec<&str> {
        result.entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[tokio::test]
    async fn text_matches_title_username_and_url_case_insensitively() {
        let (backend, ..) = seeded();
        let by_url = SearchFilter {
            text: Some("EXAMPLE.COM".into()),
            ..SearchFilter::default()
        };
        assert_eq!(titles(&backend.search_entries(&by_url).await.unwrap()), ["GitLab"]);

        let by_user = SearchFilter {
            text: Some("Adm".into()),
            ..SearchFilter::default()
        };
        assert_eq!(titles(&backend.search_entries(&by_user).await.unwrap()), ["Router"]);
    }

    #[tokio::test]
    async fn category_filter_uses_the_name_and_unknown_names_match_nothing() {
        let (backend, work, _) = seeded();
        let filter = SearchFilter {
            category_name: Some("work".into()),
            ..SearchFilter::default()
        };
        let result = backend.search_entries(&filter).await.unwrap();
        assert_eq!(titles(&result), ["GitLab", "Jira"]);
        assert_eq!(result.entries[0].category_name.as_deref(), Some("Work"));
        assert_eq!(result.category_distribution.len(), 1);
        assert_eq!(result.category_distribution[0].id, work);

        let missing = SearchFilter {
            category_name: Some("Nope".into()),
            ..SearchFilter::default()
        };
        let result = backend.search_entries(&missing).await.unwrap();
        assert!(result.entries.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.max_count, 4);
    }

    #[tokio::test]
    async fn distribution_is_sorted_and_omits_empty_categories() {
        let (backend, ..) = seeded();
        backend.insert_category("Archive");
        let result = backend.search_entries(&SearchFilter::default()).await.unwrap();
        let names: Vec<_> = result
            .category_distribution
            .iter()
            .map(|c| (c.name.as_str(), c.entry_count))
            .collect();
        assert_eq!(names, [("Home", 1), ("Work", 2)]);
        assert_eq!(result.total_count, 4);
    }

    #[tokio::test]
    async fn favorites_only_with_counts() {
        let (backend, ..) = seeded();
        let filter = SearchFilter {
            favorites_only: true,
            ..SearchFilter::default()
        };
        let result = backend.search_entries(&filter).await.unwrap();
        assert_eq!(titles(&result), ["GitLab"]);
        assert_eq!(result.total_count, 1);
        assert_eq!(result.max_count, 4);
    }

    #[tokio::test]
    async fn deleting_a_category_detaches_its_entries() {
        let (backend, work, _) = seeded();
        backend.delete_category(&work).await.unwrap();
        assert_eq!(backend.entry_count(), 4);
        let result = backend.search_entries(&SearchFilter::default()).await.unwrap();
        assert!(result.entries.iter().all(|e| e.category_id.as_ref() != Some(&work)));
        assert_eq!(result.category_distribution.len(), 1);

        let err = backend.delete_category(&work).await.unwrap_err();
        assert!(err.is_code(codes::CATEGORY_NOT_FOUND));
    }

    #[tokio::test]
    async fn rename_trims_and_rejects_blank_or_duplicate_names() {
        let (backend, work, _) = seeded();
        backend.rename_category(&work, "  Office ").await.unwrap();
        assert_eq!(backend.category_name(&work).as_deref(), Some("Office"));

        let blank = backend.rename_category(&work, "  ").await.unwrap_err();
        assert!(blank.is_code(codes::CATEGORY_INVALID_NAME));
        let duplicate = backend.rename_category(&work, "HOME").await.unwrap_err();
        assert!(duplicate.is_code(codes::CATEGORY_DUPLICATE_NAME));
        // same name with different case is not a conflict with itself
        backend.rename_category(&work, "office").await.unwrap();
    }

    #[tokio::test]
    async fn create_category_validates_like_rename() {
        let (backend, ..) = seeded();
        let id = backend.create_category(" Travel ").await.unwrap();
        assert_eq!(backend.category_name(&id).as_deref(), Some("Travel"));
        assert!(backend
            .create_category("work")
            .await
            .unwrap_err()
            .is_code(codes::CATEGORY_DUPLICATE_NAME));
        assert_eq!(backend.calls(Operation::CreateCategory), 2);
    }

    #[tokio::test]
    async fn search_categories_matches_substrings() {
        let (backend, ..) = seeded();
        let found = backend.search_categories("OR").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Work");
        assert_eq!(found[0].entry_count, 2);
        assert_eq!(backend.search_categories("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_an_unknown_entry_fails() {
        let backend = MemoryBackend::new();
        let err = backend.delete_entry(&EntryId::from("ghost")).await.unwrap_err();
        assert!(err.is_code(codes::ENTRY_NOT_FOUND));
    }

    #[tokio::test]
    async fn locked_vault_rejects_operations_but_reports_status() {
        let (backend, ..) = seeded();
        backend.set_locked(true);
        let err = backend.search_entries(&SearchFilter::default()).await.unwrap_err();
        assert!(err.is_code(codes::AUTH_VAULT_LOCKED));
        let status = backend.vault_status().await.unwrap();
        assert!(!status.is_unlocked());

        backend.set_locked(false);
        assert!(backend.vault_status().await.unwrap().is_unlocked());
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let (backend, ..) = seeded();
        backend.fail_next(Operation::SearchEntries, BackendError::operation_failed("boom"));
        assert!(backend.search_entries(&SearchFilter::default()).await.is_err());
        assert!(backend.search_entries(&SearchFilter::default()).await.is_ok());
        assert_eq!(backend.calls(Operation::SearchEntries), 2);
        assert_eq!(backend.calls(Operation::DeleteEntry), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_the_answer() {
        let (backend, ..) = seeded();
        backend.set_latency(Operation::VaultStatus, Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        backend.vault_status().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn seed_round_trips_through_toml_and_loads() {
        let demo = SeedVault::demo();
        let text = demo.to_toml().unwrap();
        assert_eq!(SeedVault::from_toml(&text).unwrap(), demo);

        let backend = MemoryBackend::from_seed(&demo);
        assert_eq!(backend.entry_count(), demo.entries.len());
    }

    #[test]
    fn seed_entries_may_name_undeclared_categories() {
        let seed = SeedVault::from_toml(
            r#"
            [[entries]]
            title = "Wiki"
            category = "Docs"
            "#,
        )
        .unwrap();
        assert!(seed.categories.is_empty());
        let backend = MemoryBackend::from_seed(&seed);
        let id = backend.insert_category("docs");
        assert_eq!(backend.category_name(&id).as_deref(), Some("Docs"));
    }
}
