//! UI rendering with Ratatui.

use crate::app::{App, Focus, InputMode, SidebarItem};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use vaultsync_core::NotificationKind;

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    // Split into sidebar (30%) and main content (70%)
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    render_sidebar(frame, app, columns[0]);
    render_entries(frame, app, columns[1]);
    render_status_line(frame, app, rows[1]);

    match app.input_mode {
        InputMode::Search => render_input_overlay(frame, " 🔍 Search ", &app.search_input, Color::Magenta, area),
        InputMode::Rename => render_input_overlay(frame, " ✏ Rename Category ", &app.rename_input, Color::Yellow, area),
        InputMode::Normal => {}
    }

    render_toasts(frame, app, area);
}

fn selected_style() -> Style {
    Style::default()
        .bg(Color::Rgb(60, 60, 80))
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn border_color(app: &App, focus: Focus) -> Color {
    if app.focus == focus && app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

/// Render the category sidebar.
fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" 📁 Categories ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, Focus::Sidebar)));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let filter = &app.view.filter;
    let items: Vec<ListItem> = app
        .sidebar_items()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let (label, active, busy) = match &item {
                SidebarItem::All { count } => (
                    format!("All ({count})"),
                    filter.category_name.is_none() && !filter.favorites_only,
                    false,
                ),
                SidebarItem::Favorites => ("★ Favorites".to_string(), filter.favorites_only, false),
                SidebarItem::Category(category) => (
                    format!("{} ({})", category.name, category.entry_count),
                    filter.category_name.as_deref() == Some(category.name.as_str()),
                    app.dashboard.is_deleting_category(&category.id)
                        || app.dashboard.is_renaming_category(&category.id),
                ),
            };

            let marker = if active { "▸ " } else { "  " };
            let suffix = if busy { " …" } else { "" };
            let style = if i == app.sidebar_selected_index {
                selected_style()
            } else if busy {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Yellow)
            };

            ListItem::new(Line::from(format!("{marker}{label}{suffix}"))).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

/// Render the entry list.
fn render_entries(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let title = format!(" 🔑 Entries {}/{} ", view.total_count, view.max_count);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, Focus::Entries)));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.entries.is_empty() {
        let message = if view.is_loading { "Loading…" } else { "No entries match the filter" };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, centered_rect(40, 1, inner));
        return;
    }

    let items: Vec<ListItem> = view
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let deleting = app.dashboard.is_deleting_entry(&entry.id);
            let star = if entry.favorite { "★ " } else { "  " };
            let mut spans = vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::raw(entry.title.clone()),
            ];
            if let Some(username) = &entry.username {
                spans.push(Span::styled(format!("  {username}"), Style::default().fg(Color::Green)));
            }
            if let Some(category) = &entry.category_name {
                spans.push(Span::styled(format!("  [{category}]"), Style::default().fg(Color::DarkGray)));
            }
            if deleting {
                spans.push(Span::styled("  deleting…", Style::default().fg(Color::Red)));
            }

            let style = if i == app.entry_selected_index && app.focus == Focus::Entries {
                selected_style()
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}

fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.view;
    let mut spans = Vec::new();

    let (lock_label, lock_color) = match view.vault_status {
        Some(status) if status.is_unlocked() => ("unlocked", Color::Green),
        Some(_) => ("locked", Color::Red),
        None => ("status unknown", Color::DarkGray),
    };
    spans.push(Span::styled(format!(" {lock_label} "), Style::default().fg(lock_color)));

    if view.is_loading {
        spans.push(Span::styled(" loading… ", Style::default().fg(Color::Cyan)));
    }
    if let Some(error) = &view.error {
        spans.push(Span::styled(
            format!(" {} ", error.user_message()),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(text) = &view.debounced_text {
        spans.push(Span::styled(format!(" search: {text} "), Style::default().fg(Color::Magenta)));
    }
    spans.push(Span::styled(
        " /: search | f: favorites | Enter: filter | d/D: delete | r: rename | R: refresh | x: reset | q: quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input_overlay(frame: &mut Frame, title: &str, value: &str, color: Color, area: Rect) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, 3, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let input_line = Line::from(vec![
        Span::styled("▸ ", Style::default().fg(color)),
        Span::styled(value, Style::default().fg(Color::White)),
        Span::styled("_", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
}

/// Stack toasts in the top-right corner, newest at the bottom.
fn render_toasts(frame: &mut Frame, app: &App, area: Rect) {
    let width = 48.min(area.width);
    for (i, toast) in app.toasts.iter().enumerate() {
        let y = area.y + 1 + (i as u16) * 4;
        if y + 4 > area.y + area.height {
            break;
        }
        let rect = Rect::new(area.x + area.width - width, y, width, 4);
        let color = match toast.notification.kind {
            NotificationKind::Success => Color::Green,
            NotificationKind::Failure => Color::Red,
        };

        frame.render_widget(Clear, rect);
        let block = Block::default()
            .title(format!(" {} ", toast.notification.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        frame.render_widget(
            Paragraph::new(toast.notification.description.as_str()).style(Style::default().fg(Color::White)),
            inner,
        );
    }
}

/// Helper to create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
