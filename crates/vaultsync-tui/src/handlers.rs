//! Keyboard event handling.

use crate::app::{App, Focus, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle a key event. Returns true if the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Search => handle_search_key(app, key),
        InputMode::Rename => handle_rename_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) -> bool {
    // Ctrl+C to quit
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return true;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.quit();
            true
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.move_down();
            false
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.move_up();
            false
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Sidebar => Focus::Entries,
                Focus::Entries => Focus::Sidebar,
            };
            false
        }
        KeyCode::Enter => {
            if app.focus == Focus::Sidebar {
                app.activate_sidebar_item();
            }
            false
        }
        KeyCode::Char('/') => {
            app.start_search();
            false
        }
        KeyCode::Char('f') => {
            app.toggle_favorites();
            false
        }
        KeyCode::Char('x') => {
            app.reset_search();
            false
        }
        KeyCode::Char('R') => {
            app.refresh();
            false
        }
        KeyCode::Char('d') => {
            if app.focus == Focus::Entries {
                app.delete_selected_entry();
            }
            false
        }
        KeyCode::Char('D') => {
            if app.focus == Focus::Sidebar {
                app.delete_selected_category();
            }
            false
        }
        KeyCode::Char('r') => {
            if app.focus == Focus::Sidebar {
                app.start_rename();
            }
            false
        }
        _ => false,
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => app.finish_search(),
        KeyCode::Char(c) => {
            app.search_input.push(c);
            app.update_search();
        }
        KeyCode::Backspace => {
            app.search_input.pop();
            app.update_search();
        }
        _ => {}
    }
    false
}

fn handle_rename_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => app.cancel_rename(),
        KeyCode::Enter => app.submit_rename(),
        KeyCode::Char(c) => app.rename_input.push(c),
        KeyCode::Backspace => {
            app.rename_input.pop();
        }
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crossterm::event::KeyEventKind;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;
    use vaultsync_core::{Dashboard, MemoryBackend, SeedVault, SyncSettings};

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn app() -> (App, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::from_seed(&SeedVault::demo()));
        let mut app = App::new(Dashboard::mount(Arc::clone(&backend), SyncSettings::default()));
        sleep(Duration::from_millis(10)).await;
        app.tick();
        (app, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn search_mode_edits_the_filter_text() {
        let (mut app, _) = app().await;
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.input_mode, InputMode::Search);
        type_text(&mut app, "mail");
        // 'q' is text while searching
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.dashboard.filter().text.as_deref(), Some("mail"));
        assert_eq!(app.focus, Focus::Entries);
    }

    #[tokio::test(start_paused = true)]
    async fn escape_clears_the_search() {
        let (mut app, _) = app().await;
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "bank");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.dashboard.filter().text, None);
    }

    #[tokio::test(start_paused = true)]
    async fn rename_mode_submits_the_new_name() {
        let (mut app, backend) = app().await;
        app.sidebar_selected_index = 2;
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.input_mode, InputMode::Rename);
        assert_eq!(app.rename_input, "Finance");

        for _ in 0.."Finance".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "Money");
        press(&mut app, KeyCode::Enter);
        sleep(Duration::from_millis(10)).await;
        app.tick();

        let names: Vec<_> = app
            .view
            .available_categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Money", "Personal", "Work"]);
        assert_eq!(backend.calls(vaultsync_core::memory::Operation::RenameCategory), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn favorites_key_toggles_the_filter() {
        let (mut app, _) = app().await;
        press(&mut app, KeyCode::Char('f'));
        assert!(app.dashboard.filter().favorites_only);
        press(&mut app, KeyCode::Char('f'));
        assert!(!app.dashboard.filter().favorites_only);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_unmounts_the_dashboard() {
        let (mut app, _) = app().await;
        let key = KeyEvent {
            kind: KeyEventKind::Press,
            ..KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        };
        assert!(handle_key(&mut app, key));
        assert_eq!(app.state, AppState::Quit);
    }
}
