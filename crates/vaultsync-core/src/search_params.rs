//! The current search filter and its debounced text.

use crate::debounce::Debounced;
use crate::models::SearchFilter;
use std::time::Duration;

/// Delay applied to typed search text before it drives a fetch.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Result of a setter: the filter before and after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChange {
    pub previous: SearchFilter,
    pub current: SearchFilter,
}

impl FilterChange {
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }

    pub fn text_changed(&self) -> bool {
        self.previous.text != self.current.text
    }

    /// True when a non-typed field (category or favorites) changed.
    pub fn discrete_changed(&self) -> bool {
        self.previous.category_name != self.current.category_name
            || self.previous.favorites_only != self.current.favorites_only
    }
}

/// Owner of the [`SearchFilter`].
///
/// The filter is only reachable through the named setters, each of which
/// hands back a fresh copy of the result.
#[derive(Debug)]
pub struct SearchParams {
    filter: SearchFilter,
    debounced_text: Debounced<Option<String>>,
}

impl SearchParams {
    pub fn new(debounce: Duration) -> Self {
        Self {
            filter: SearchFilter::default(),
            debounced_text: Debounced::new(None, debounce),
        }
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    /// The search text once typing has paused.
    pub fn debounced_text(&self) -> Option<String> {
        self.debounced_text.get()
    }

    /// The filter a fetch should use: typed text only counts once settled.
    pub fn fetch_filter(&self) -> SearchFilter {
        SearchFilter {
            text: self.debounced_text(),
            ..self.filter.clone()
        }
    }

    /// True while typed text is still waiting to settle.
    pub fn is_text_settling(&self) -> bool {
        self.debounced_text.is_settling()
    }

    /// Settle the typed text now.
    pub fn flush_text(&mut self) {
        self.debounced_text.flush();
    }

    /// Store the raw search text. An empty string clears it.
    pub fn set_text(&mut self, text: &str) -> FilterChange {
        let text = non_empty(text);
        self.debounced_text.set(text.clone());
        self.apply(|filter| filter.text = text)
    }

    /// Constrain to a category. Selecting the category that is already
    /// active deselects it.
    pub fn set_category_name(&mut self, name: Option<&str>) -> FilterChange {
        let name = name.and_then(non_empty);
        let next = if name.is_some() && name == self.filter.category_name {
            None
        } else {
            name
        };
        self.apply(|filter| filter.category_name = next)
    }

    /// Drop the category constraint without toggle semantics.
    pub fn clear_category(&mut self) -> FilterChange {
        self.apply(|filter| filter.category_name = None)
    }

    /// Replace the active category name in place, used when the category it
    /// refers to was renamed.
    pub fn replace_category_name(&mut self, name: &str) -> FilterChange {
        let name = non_empty(name);
        self.apply(|filter| filter.category_name = name)
    }

    pub fn set_favorites_only(&mut self, favorites_only: bool) -> FilterChange {
        self.apply(|filter| filter.favorites_only = favorites_only)
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) -> FilterChange {
        self.debounced_text.set(None);
        self.debounced_text.flush();
        self.apply(|filter| *filter = SearchFilter::default())
    }

    fn apply(&mut self, update: impl FnOnce(&mut SearchFilter)) -> FilterChange {
        let previous = self.filter.clone();
        let mut current = previous.clone();
        update(&mut current);
        self.filter = current.clone();
        FilterChange { previous, current }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn defaults_are_unconstrained() {
        let params = SearchParams::default();
        assert_eq!(params.filter(), &SearchFilter::default());
        assert!(!params.filter().favorites_only);
        assert_eq!(params.debounced_text(), None);
    }

    #[tokio::test]
    async fn empty_text_is_stored_as_absent() {
        let mut params = SearchParams::default();
        params.set_text("mail");
        let change = params.set_text("");
        assert_eq!(change.previous.text.as_deref(), Some("mail"));
        assert_eq!(change.current.text, None);
        assert!(change.text_changed());
        assert!(!change.discrete_changed());
    }

    #[tokio::test]
    async fn selecting_the_active_category_deselects_it() {
        let mut params = SearchParams::default();
        let first = params.set_category_name(Some("Work"));
        assert_eq!(first.current.category_name.as_deref(), Some("Work"));
        assert!(first.discrete_changed());

        let second = params.set_category_name(Some("Work"));
        assert_eq!(second.current.category_name, None);

        params.set_category_name(Some("Work"));
        let switched = params.set_category_name(Some("Personal"));
        assert_eq!(switched.current.category_name.as_deref(), Some("Personal"));
    }

    #[tokio::test]
    async fn clearing_an_absent_category_is_a_noop() {
        let mut params = SearchParams::default();
        assert!(params.set_category_name(None).is_noop());
        assert!(params.set_category_name(Some("")).is_noop());
        assert!(params.clear_category().is_noop());
    }

    #[tokio::test]
    async fn favorites_toggle_is_applied_directly() {
        let mut params = SearchParams::default();
        let change = params.set_favorites_only(true);
        assert!(change.current.favorites_only);
        assert!(change.discrete_changed());
        assert!(params.set_favorites_only(true).is_noop());
    }

    #[tokio::test]
    async fn every_setter_returns_a_distinct_copy() {
        let mut params = SearchParams::default();
        let change = params.set_text("bank");
        assert_ne!(change.previous, change.current);
        assert_eq!(&change.current, params.filter());
        // the returned value is detached from the store
        params.set_favorites_only(true);
        assert!(!change.current.favorites_only);
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let mut params = SearchParams::default();
        params.set_text("x");
        params.set_category_name(Some("Work"));
        params.set_favorites_only(true);

        let change = params.reset();
        assert_eq!(change.current, SearchFilter::default());
        assert!(change.text_changed());
        assert!(change.discrete_changed());
        assert_eq!(params.debounced_text(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_text_follows_after_the_delay() {
        let mut params = SearchParams::default();
        params.set_text("ema");
        params.set_text("email");
        assert_eq!(params.debounced_text(), None);

        sleep(DEFAULT_SEARCH_DEBOUNCE + Duration::from_millis(10)).await;
        assert_eq!(params.debounced_text().as_deref(), Some("email"));
        assert_eq!(params.filter().text.as_deref(), Some("email"));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_filter_uses_only_settled_text() {
        let mut params = SearchParams::default();
        params.set_text("ba");
        params.set_favorites_only(true);
        assert!(params.is_text_settling());

        let filter = params.fetch_filter();
        assert_eq!(filter.text, None);
        assert!(filter.favorites_only);

        params.flush_text();
        assert!(!params.is_text_settling());
        assert_eq!(params.fetch_filter().text.as_deref(), Some("ba"));
    }

    #[tokio::test]
    async fn replace_category_name_keeps_other_fields() {
        let mut params = SearchParams::default();
        params.set_favorites_only(true);
        params.set_category_name(Some("Work"));
        let change = params.replace_category_name("Office");
        assert_eq!(change.current.category_name.as_deref(), Some("Office"));
        assert!(change.current.favorites_only);
    }
}
