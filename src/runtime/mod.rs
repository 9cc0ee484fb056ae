use std::env;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::error::Error;
use crate::library::{BookSelection, LoftyMetadata, ProgressStore, discover_books};
use crate::mpris::{ControlCmd, MprisHandle};
use crate::tracker::PlaybackTracker;

mod event_loop;
mod logging;
mod settings;

pub type Tracker = PlaybackTracker<AudioPlayer, LoftyMetadata, ProgressStore, MprisHandle>;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_error) = settings::load_settings();
    logging::init(&settings)?;
    if let Some(e) = settings_error {
        warn!(error = %e, "failed to load config, using defaults");
    }

    let root = match env::args().nth(1).map(PathBuf::from) {
        Some(dir) => dir,
        None => match settings.library.root.clone() {
            Some(dir) => dir,
            None => env::current_dir()?,
        },
    };

    let progress_path = settings
        .progress_path()
        .ok_or_else(|| Error::InvalidConfig("no location for the progress file".into()))?;
    let store = ProgressStore::open(progress_path)?;

    let mut books = discover_books(&root, &settings.library)?;
    for book in &mut books {
        store.apply_to(book);
    }
    info!(root = %root.display(), books = books.len(), store = %store.path().display(), "library loaded");

    let mut app = App::new(books);
    app.set_library_root(root);
    if let Some(i) = app.books.iter().position(|b| b.has_resume_point()) {
        app.set_selected(i);
    }

    let (audio_player, engine_events) =
        AudioPlayer::new(settings.audio.clone(), settings.playback.step())?;

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);

    let mut tracker = PlaybackTracker::new(
        audio_player,
        LoftyMetadata::new(settings.library.clone()),
        store,
        mpris.clone(),
        &settings.playback,
        settings.library.clone(),
    );
    let (selection, selection_rx) = BookSelection::channel();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut ctx = event_loop::LoopContext {
            settings: &settings,
            app: &mut app,
            tracker: &mut tracker,
            mpris: &mpris,
            selection: &selection,
            engine_events: &engine_events,
            selection_rx: &selection_rx,
            control_rx: &control_rx,
        };
        event_loop::run(&mut terminal, &mut ctx)
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracker.shutdown();
    tracker
        .engine()
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
    info!("bye");

    run_result
}
