use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use crate::app::App;
use crate::audio::{EngineEvent, MediaEngine, TransportState};
use crate::config;
use crate::error::Error;
use crate::library::{Book, BookSelection};
use crate::mpris::{ControlCmd, MprisHandle};
use crate::ui;

use super::Tracker;

/// Everything the loop reads from or drives.
pub struct LoopContext<'a> {
    pub settings: &'a config::Settings,
    pub app: &'a mut App,
    pub tracker: &'a mut Tracker,
    pub mpris: &'a MprisHandle,
    pub selection: &'a BookSelection,
    pub engine_events: &'a Receiver<EngineEvent>,
    pub selection_rx: &'a Receiver<Book>,
    pub control_rx: &'a Receiver<ControlCmd>,
}

/// Main terminal event loop: forwards engine events, selections, desktop
/// controls and keys to the tracker and redraws. Returns `Ok(())` when
/// shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ctx: &mut LoopContext<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let view_changes = ctx.tracker.view_mut().subscribe();
    let mut dirty = true;

    loop {
        while let Ok(ev) = ctx.engine_events.try_recv() {
            if let EngineEvent::StateChanged(state) = ev {
                ctx.app.playback = state;
                ctx.mpris.set_playback(state);
                dirty = true;
            }
            ctx.tracker.handle_engine_event(ev, Instant::now());
        }

        while let Ok(book) = ctx.selection_rx.try_recv() {
            open_selected(ctx, book)?;
            dirty = true;
        }

        while let Ok(cmd) = ctx.control_rx.try_recv() {
            if handle_control_cmd(cmd, ctx)? {
                return Ok(());
            }
        }

        ctx.tracker.poll_timer(Instant::now());

        if let Some(book) = ctx.tracker.current_book() {
            ctx.app.sync_book(book);
        }

        if view_changes.try_iter().count() > 0 {
            dirty = true;
        }
        if dirty {
            let step_secs = ctx.settings.playback.step_secs;
            terminal.draw(|f| {
                ui::draw(f, &*ctx.app, ctx.tracker.view(), &ctx.settings.ui, step_secs)
            })?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    dirty = true;
                    if handle_key_event(key, ctx)? {
                        return Ok(());
                    }
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
}

/// "Selected book changed": hand the book to the tracker and mark it open.
///
/// A book that cannot be opened leaves a status line instead of ending the
/// session.
fn open_selected(ctx: &mut LoopContext<'_>, book: Book) -> Result<(), Box<dyn std::error::Error>> {
    let path = book.path.clone();
    let previous = ctx.app.open_book().map(|b| b.path.clone());

    let outcome = ctx.tracker.on_selected_book_changed(book);

    // The book just closed was saved on the way out.
    if let Some(prev) = previous {
        if let Some(entry) = ctx.app.books.iter_mut().find(|b| b.path == prev) {
            ctx.tracker.store().apply_to(entry);
        }
    }

    match outcome {
        Ok(()) => {
            ctx.app.mark_open(&path);
            ctx.app.clear_status();
        }
        Err(e) => match open_failure_status(&e) {
            Some(status) => {
                warn!(dir = %path.display(), error = %e, "cannot open book");
                ctx.app.set_status(status);
            }
            None => return Err(e.into()),
        },
    }
    Ok(())
}

/// Status line for errors that only concern the book being opened.
fn open_failure_status(e: &Error) -> Option<String> {
    match e {
        Error::EmptyBook(dir) => Some(format!("Nothing to play in {}", dir.display())),
        Error::Io(io) => Some(format!("Cannot open book: {io}")),
        _ => None,
    }
}

fn handle_control_cmd(
    cmd: ControlCmd,
    ctx: &mut LoopContext<'_>,
) -> Result<bool, Box<dyn std::error::Error>> {
    debug!(?cmd, "desktop control");
    match cmd {
        ControlCmd::Quit => return Ok(true),
        ControlCmd::Play => {
            if ctx.app.playback != TransportState::Playing {
                ctx.tracker.play_or_pause()?;
            }
        }
        ControlCmd::Pause => ctx.tracker.engine().pause()?,
        ControlCmd::PlayPause => ctx.tracker.play_or_pause()?,
        ControlCmd::Stop => ctx.tracker.stop()?,
        ControlCmd::Next => ctx.tracker.play_next_file()?,
        ControlCmd::Prev => ctx.tracker.play_previous_file()?,
    }
    Ok(false)
}

fn handle_key_event(
    key: KeyEvent,
    ctx: &mut LoopContext<'_>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('j') | KeyCode::Down => ctx.app.next(),
        KeyCode::Char('k') | KeyCode::Up => ctx.app.prev(),
        KeyCode::Enter => {
            if let Some(book) = ctx.app.selected_book() {
                ctx.selection.select(book.clone());
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => ctx.tracker.play_or_pause()?,
        KeyCode::Char('h') | KeyCode::Left => ctx.tracker.jump_back()?,
        KeyCode::Char('l') | KeyCode::Right => ctx.tracker.jump_forward()?,
        KeyCode::Char('H') => ctx.tracker.play_previous_file()?,
        KeyCode::Char('L') => ctx.tracker.play_next_file()?,
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let tenths = c.to_digit(10).unwrap_or(0);
            ctx.tracker.seek_to(f64::from(tenths) / 10.0)?;
        }
        _ => {}
    }
    Ok(false)
}
