//! Application state management.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};
use vaultsync_core::{
    CategoryCount, Dashboard, DashboardEvent, DashboardView, EntrySummary, MemoryBackend,
    Notification,
};

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(4);
/// Maximum number of toasts shown at once.
pub const TOAST_LIMIT: usize = 3;

/// Application state.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Running,
    /// Application should quit.
    Quit,
}

/// Input mode for the application.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    /// Normal navigation mode.
    Normal,
    /// Typing search text.
    Search,
    /// Typing a new name for the selected category.
    Rename,
}

/// Focus area.
#[derive(Debug, Clone, PartialEq)]
pub enum Focus {
    Sidebar,
    Entries,
}

/// A row of the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub enum SidebarItem {
    All { count: usize },
    Favorites,
    Category(CategoryCount),
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// Main application model.
pub struct App {
    /// Current application state.
    pub state: AppState,
    /// Current input mode.
    pub input_mode: InputMode,
    /// Current focus area.
    pub focus: Focus,
    pub dashboard: Dashboard<MemoryBackend>,
    /// Snapshot of the dashboard taken at the last tick.
    pub view: DashboardView,
    pub sidebar_selected_index: usize,
    pub entry_selected_index: usize,
    /// Search text as typed.
    pub search_input: String,
    /// Pending name in rename mode.
    pub rename_input: String,
    pub toasts: VecDeque<Toast>,
    events: broadcast::Receiver<DashboardEvent>,
}

impl App {
    /// Create a new application instance over a mounted dashboard.
    pub fn new(dashboard: Dashboard<MemoryBackend>) -> Self {
        let events = dashboard.subscribe();
        let view = dashboard.view();
        Self {
            state: AppState::Running,
            input_mode: InputMode::Normal,
            focus: Focus::Sidebar,
            dashboard,
            view,
            sidebar_selected_index: 0,
            entry_selected_index: 0,
            search_input: String::new(),
            rename_input: String::new(),
            toasts: VecDeque::new(),
            events,
        }
    }

    /// Pull the latest dashboard state and notifications.
    pub fn tick(&mut self) {
        self.view = self.dashboard.view();
        loop {
            match self.events.try_recv() {
                Ok(DashboardEvent::Notification(notification)) => self.push_toast(notification),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dropped dashboard events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        self.expire_toasts(Instant::now());

        let sidebar_len = self.sidebar_items().len();
        self.sidebar_selected_index = self.sidebar_selected_index.min(sidebar_len.saturating_sub(1));
        self.entry_selected_index = self
            .entry_selected_index
            .min(self.view.entries.len().saturating_sub(1));
    }

    pub fn push_toast(&mut self, notification: Notification) {
        self.toasts.push_back(Toast {
            notification,
            shown_at: Instant::now(),
        });
        while self.toasts.len() > TOAST_LIMIT {
            self.toasts.pop_front();
        }
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < TOAST_TTL);
    }

    /// Sidebar rows: "All", "Favorites", then every known category.
    pub fn sidebar_items(&self) -> Vec<SidebarItem> {
        let mut items = vec![
            SidebarItem::All {
                count: self.view.max_count,
            },
            SidebarItem::Favorites,
        ];
        items.extend(
            self.view
                .available_categories
                .iter()
                .cloned()
                .map(SidebarItem::Category),
        );
        items
    }

    pub fn selected_sidebar_item(&self) -> Option<SidebarItem> {
        self.sidebar_items().into_iter().nth(self.sidebar_selected_index)
    }

    pub fn selected_category(&self) -> Option<CategoryCount> {
        match self.selected_sidebar_item() {
            Some(SidebarItem::Category(category)) => Some(category),
            _ => None,
        }
    }

    pub fn selected_entry(&self) -> Option<&EntrySummary> {
        self.view.entries.get(self.entry_selected_index)
    }

    /// Apply the selected sidebar row to the filter.
    pub fn activate_sidebar_item(&mut self) {
        match self.selected_sidebar_item() {
            Some(SidebarItem::All { .. }) => {
                self.dashboard.set_category_name(None);
                self.dashboard.set_favorites_only(false);
            }
            Some(SidebarItem::Favorites) => {
                self.toggle_favorites();
            }
            Some(SidebarItem::Category(category)) => {
                self.dashboard.set_category_name(Some(&category.name));
            }
            None => {}
        }
        self.entry_selected_index = 0;
    }

    pub fn toggle_favorites(&mut self) {
        let favorites_only = !self.dashboard.filter().favorites_only;
        self.dashboard.set_favorites_only(favorites_only);
    }

    pub fn move_up(&mut self) {
        let index = match self.focus {
            Focus::Sidebar => &mut self.sidebar_selected_index,
            Focus::Entries => &mut self.entry_selected_index,
        };
        *index = index.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = match self.focus {
            Focus::Sidebar => self.sidebar_items().len(),
            Focus::Entries => self.view.entries.len(),
        };
        let index = match self.focus {
            Focus::Sidebar => &mut self.sidebar_selected_index,
            Focus::Entries => &mut self.entry_selected_index,
        };
        if *index + 1 < len {
            *index += 1;
        }
    }

    /// Start search mode, editing the current filter text.
    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_input = self.dashboard.filter().text.unwrap_or_default();
    }

    pub fn update_search(&mut self) {
        self.dashboard.set_text(&self.search_input);
        self.entry_selected_index = 0;
    }

    /// Leave search mode, keeping the typed text.
    pub fn finish_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.focus = Focus::Entries;
    }

    /// Leave search mode and clear the text.
    pub fn cancel_search(&mut self) {
        self.search_input.clear();
        self.update_search();
        self.input_mode = InputMode::Normal;
    }

    pub fn reset_search(&mut self) {
        self.search_input.clear();
        self.dashboard.reset_search();
        self.sidebar_selected_index = 0;
        self.entry_selected_index = 0;
    }

    pub fn start_rename(&mut self) {
        if let Some(category) = self.selected_category() {
            self.rename_input = category.name;
            self.input_mode = InputMode::Rename;
        }
    }

    pub fn cancel_rename(&mut self) {
        self.rename_input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn submit_rename(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(category) = self.selected_category() else {
            return;
        };
        let name = std::mem::take(&mut self.rename_input);
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            dashboard.rename_category(&category.id, &name).await;
        });
    }

    pub fn delete_selected_entry(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let id = entry.id.clone();
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            dashboard.delete_entry(&id).await;
        });
    }

    pub fn delete_selected_category(&mut self) {
        let Some(category) = self.selected_category() else {
            return;
        };
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            dashboard.delete_category(&category.id).await;
        });
    }

    pub fn refresh(&mut self) {
        let dashboard = self.dashboard.clone();
        tokio::spawn(async move {
            dashboard.refresh_entries().await;
        });
    }

    pub fn quit(&mut self) {
        self.dashboard.unmount();
        self.state = AppState::Quit;
    }
}
