//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::time::Duration;

use crate::app::App;
use crate::audio::TransportState;
use crate::config::UiSettings;
use crate::library::Book;
use crate::tracker::ViewState;

/// Render the controls help text, incorporating the jump step.
fn controls_text(step_secs: u64) -> String {
    [
        "[j/k] up/down".to_string(),
        "[enter] open book".to_string(),
        "[space/p] play/pause".to_string(),
        format!("[h/l] jump -/+{}s", step_secs),
        "[H/L] prev/next file".to_string(),
        "[0-9] seek 0-90%".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// Format a `Duration` as `H:MM:SS`, or `MM:SS` under an hour.
fn format_hmmss(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// One line of the book list: title plus how much of it was listened to.
fn book_line(book: &Book, is_open: bool) -> String {
    let marker = if is_open { "* " } else { "  " };
    let pct = (book.listened_ratio().clamp(0.0, 1.0) * 100.0).round() as u32;
    if book.has_resume_point() {
        format!("{}{} [{}%]", marker, book.title, pct)
    } else {
        format!("{}{}", marker, book.title)
    }
}

fn state_text(state: TransportState) -> &'static str {
    match state {
        TransportState::Stopped => "Stopped",
        TransportState::Playing => "Playing",
        TransportState::Paused => "Paused",
    }
}

fn padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, view: &ViewState, ui: &UiSettings, step_secs: u64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(10),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" bookend ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    draw_book_list(frame, app, chunks[1]);
    draw_now_playing(frame, app, view, ui, chunks[2]);

    let mut footer_text = controls_text(step_secs);
    if let Some(status) = &app.status {
        footer_text = format!("{} • {}", status, footer_text);
    }
    let footer = Paragraph::new(footer_text)
        .block(padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

fn draw_book_list(frame: &mut Frame, app: &App, area: Rect) {
    // Only build ListItems for the visible window, centred on the selection.
    let total = app.books.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let (start, end) = if total <= list_height || list_height == 0 {
        (0, total)
    } else {
        let half = list_height / 2;
        let mut start = app.selected.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height)
    };

    let items: Vec<ListItem> = app.books[start..end]
        .iter()
        .enumerate()
        .map(|(offset, book)| ListItem::new(book_line(book, app.open == Some(start + offset))))
        .collect();

    let title = match &app.library_root {
        Some(root) => format!(" books: {} ", root.display()),
        None => " books ".to_string(),
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ratatui::widgets::ListState::default();
    if total > 0 {
        state.select(Some(app.selected - start));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_now_playing(frame: &mut Frame, app: &App, view: &ViewState, ui: &UiSettings, area: Rect) {
    let block = padded(" now playing ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if !view.is_book_open() {
        frame.render_widget(Paragraph::new("No book open. Select one and press enter."), inner);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let heading = format!(
        "{} • {}\n{}",
        view.current_title(),
        view.current_subtitle(),
        state_text(app.playback)
    );
    frame.render_widget(Paragraph::new(heading), rows[0]);

    let file_label = format!(
        "{} / {}",
        format_hmmss(view.elapsed()),
        format_hmmss(view.duration())
    );
    let file_gauge = Gauge::default()
        .block(Block::default().title("file"))
        .ratio(view.current_progress().clamp(0.0, 1.0))
        .label(file_label);
    frame.render_widget(file_gauge, rows[1]);

    let book_label = format!("{:.0}%", view.total_progress().clamp(0.0, 1.0) * 100.0);
    let book_gauge = Gauge::default()
        .block(Block::default().title("book"))
        .ratio(view.total_progress().clamp(0.0, 1.0))
        .label(book_label);
    frame.render_widget(book_gauge, rows[2]);

    if ui.show_cover_path {
        if let Some(cover) = view.book_cover_path() {
            let cover = Paragraph::new(format!("Cover: {}", cover.display()))
                .wrap(Wrap { trim: true });
            frame.render_widget(cover, rows[3]);
        }
    }
}
