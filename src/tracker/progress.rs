use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::audio::{EngineEvent, MediaEngine, QueueItem, TransportState};
use crate::config::{LibrarySettings, PlaybackSettings};
use crate::error::{Error, Result};
use crate::library::{Book, BookStore, FileMetadata, MetadataSource, file_name_of, scan_book_files};

use super::timer::ProgressTimer;
use super::view_state::ViewState;

/// Receives now-playing metadata for the platform (desktop media controls).
pub trait NowPlayingTagger {
    fn add_metadata(&self, item: &QueueItem, subtitle: &str);
}

/// `numerator / denominator`, or 0 when the denominator is zero.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Maps engine events onto the current book's progress and the view state.
///
/// Owns the current `Book`, writes its resume point through `BookStore`, and
/// resumes playback at the recorded file and offset.
pub struct PlaybackTracker<E, M, S, T> {
    engine: E,
    metadata: M,
    store: S,
    tagger: T,
    library: LibrarySettings,
    book: Option<Book>,
    view: ViewState,
    timer: ProgressTimer,
    resume_rewind: Duration,
    settle: Duration,
    /// Elapsed time of the files before the current one, from the last metadata.
    elapsed_before: Duration,
}

impl<E, M, S, T> PlaybackTracker<E, M, S, T>
where
    E: MediaEngine,
    M: MetadataSource,
    S: BookStore,
    T: NowPlayingTagger,
{
    pub fn new(
        engine: E,
        metadata: M,
        store: S,
        tagger: T,
        playback: &PlaybackSettings,
        library: LibrarySettings,
    ) -> Self {
        Self {
            engine,
            metadata,
            store,
            tagger,
            library,
            book: None,
            view: ViewState::default(),
            timer: ProgressTimer::new(playback.progress_interval()),
            resume_rewind: playback.resume_rewind(),
            settle: playback.settle(),
            elapsed_before: Duration::ZERO,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn current_book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(super) fn metadata(&self) -> &M {
        &self.metadata
    }

    #[cfg(test)]
    pub(super) fn tagger(&self) -> &T {
        &self.tagger
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer.is_enabled()
    }

    /// "Selected book changed": save where we are, stop, open the new book.
    pub fn on_selected_book_changed(&mut self, book: Book) -> Result<()> {
        info!(book = %book.title, "selected book changed");
        self.stop()?;
        self.open_book(Some(book))
    }

    /// Save progress, then stop the engine and the periodic update.
    pub fn stop(&mut self) -> Result<()> {
        self.update_progress();
        self.timer.stop();
        self.engine.stop()
    }

    /// Make `book` the current book. `None` is ignored.
    ///
    /// Rescans the book directory, clears the engine queue and loads the
    /// metadata of the resume file (or the first file). A directory without
    /// playable files is an error and leaves the current book in place.
    pub fn open_book(&mut self, book: Option<Book>) -> Result<()> {
        let Some(mut book) = book else {
            return Ok(());
        };

        let files = scan_book_files(&book.path, &self.library)?;
        if files.is_empty() {
            return Err(Error::EmptyBook(book.path));
        }
        book.files = files;
        // The caller's copy may predate the last save.
        self.store.restore(&mut book);

        self.view.set_book_cover_path(book.cover_path.clone());
        self.engine.clear_queue();

        let resume_path = book.resume_file_path();
        info!(
            book = %book.title,
            files = book.files.len(),
            resume_file = book.current_file.as_deref().unwrap_or("-"),
            "opening book"
        );
        self.book = Some(book);

        let metadata = resume_path.and_then(|p| self.metadata.file_metadata(&p));
        self.update_metadata(metadata);
        self.view.set_is_book_open(true);
        Ok(())
    }

    /// Start, resume or toggle playback.
    ///
    /// From a full stop the queue is rebuilt if needed and playback resumes
    /// at the saved file, a little before the saved offset.
    pub fn play_or_pause(&mut self) -> Result<()> {
        let Some(book) = self.book.as_ref() else {
            debug!("play/pause without an open book");
            return Ok(());
        };

        if !self.engine.is_stopped() {
            return self.engine.play_pause();
        }

        if self.engine.queue_len() == 0 {
            for file in &book.files {
                self.engine.enqueue(file.clone());
            }
        }

        let Some(resume_file) = book.current_file.clone() else {
            return self.engine.play();
        };
        let resume_at = book.current_progress.saturating_sub(self.resume_rewind);

        let Some(index) = self.engine.queue_index_of(&resume_file) else {
            warn!(file = %resume_file, "resume file is no longer in the book, starting over");
            return self.engine.play();
        };

        info!(
            file = %resume_file,
            index,
            position_ms = resume_at.as_millis() as u64,
            "resuming book"
        );
        // The engine must have loaded the queue before it can jump inside it,
        // and must be on the right item before seeking.
        self.engine.play()?;
        self.engine.settle(self.settle)?;
        self.engine.play_queue_item(index)?;
        self.engine.settle(self.settle)?;
        self.engine.seek_to(resume_at)
    }

    /// Seek to `fraction` of the current file's duration.
    pub fn seek_to(&mut self, fraction: f64) -> Result<()> {
        let secs = self.view.duration().as_secs_f64() * fraction;
        let position = Duration::try_from_secs_f64(secs).unwrap_or_default();
        self.view.set_elapsed(position);
        self.engine.seek_to(position)
    }

    pub fn jump_back(&mut self) -> Result<()> {
        self.engine.step_backward()
    }

    pub fn jump_forward(&mut self) -> Result<()> {
        self.engine.step_forward()
    }

    pub fn play_previous_file(&mut self) -> Result<()> {
        self.engine.play_previous()
    }

    pub fn play_next_file(&mut self) -> Result<()> {
        self.engine.play_next()
    }

    /// Dispatch one event reported by the engine.
    pub fn handle_engine_event(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::StateChanged(state) => self.on_state_changed(state, now),
            EngineEvent::PositionChanged(position) => self.on_position_changed(position),
            EngineEvent::TrackChanged(index) => {
                debug!(index, "track changed");
                self.on_track_advanced();
            }
        }
    }

    /// Run the periodic progress update when it is due.
    pub fn poll_timer(&mut self, now: Instant) {
        if self.timer.poll(now) {
            self.update_progress();
        }
    }

    /// Save progress one last time before the player exits.
    pub fn shutdown(&mut self) {
        self.update_progress();
        self.timer.stop();
    }

    fn on_state_changed(&mut self, state: TransportState, now: Instant) {
        self.view.set_is_playing(state == TransportState::Playing);

        match state {
            TransportState::Paused => {
                self.update_progress();
                self.timer.stop();
            }
            TransportState::Playing => {
                if !self.timer.is_enabled() {
                    self.timer.start(now);
                }
            }
            TransportState::Stopped => self.timer.stop(),
        }
    }

    fn on_position_changed(&mut self, position: Duration) {
        // Late events from a queue that has since been cleared.
        if self.engine.current_item().is_none() {
            return;
        }
        self.view.set_elapsed(position);
        let progress = ratio(
            position.as_secs_f64(),
            self.view.duration().as_secs_f64(),
        );
        self.view.set_current_progress(progress);

        if let Some(book) = &self.book {
            let total_elapsed = self.elapsed_before + position;
            let total = ratio(total_elapsed.as_secs() as f64, book.total_time.as_secs_f64());
            self.view.set_total_progress(total);
        }
    }

    fn on_track_advanced(&mut self) {
        let Some(item) = self.engine.current_item() else {
            return;
        };
        let Some(book) = self.book.as_mut() else {
            return;
        };

        let name = file_name_of(&item.path);
        if book.current_file != name {
            book.current_file = name;
            book.current_progress = Duration::ZERO;
        }

        let metadata = self.metadata.file_metadata(&item.path);
        self.update_metadata(metadata);
    }

    /// Record the engine's position as the book's resume point and persist it.
    ///
    /// A position of exactly zero means the engine is momentarily stopped,
    /// not that the listener went back to the start, so it is never saved.
    fn update_progress(&mut self) {
        let Some(item) = self.engine.current_item() else {
            return;
        };
        let Some(book) = self.book.as_mut() else {
            return;
        };

        let position = self.engine.position();
        book.current_progress = position;
        book.current_file = file_name_of(&item.path);

        if position.is_zero() {
            debug!("engine reports zero position, not saving progress");
            return;
        }

        book.total_elapsed_time = self.elapsed_before + position;
        if let Err(e) = self.store.update_progress(book) {
            warn!(book = %book.title, error = %e, "failed to save progress");
        }
    }

    fn update_metadata(&mut self, metadata: Option<FileMetadata>) {
        let Some(metadata) = metadata else {
            return;
        };
        let Some(book) = self.book.as_mut() else {
            return;
        };

        self.view.set_current_title(&metadata.title);
        self.view.set_current_subtitle(&metadata.subtitle);

        if self.engine.current_item().is_some() {
            self.engine
                .set_current_display(&metadata.title, &metadata.subtitle);
            if let Some(item) = self.engine.current_item() {
                self.tagger.add_metadata(&item, &metadata.subtitle);
            }
        }

        let resume = book.current_progress;
        self.view.set_duration(metadata.duration);
        self.view.set_current_progress(ratio(
            resume.as_secs_f64(),
            metadata.duration.as_secs_f64(),
        ));

        self.elapsed_before = metadata.elapsed_before;
        book.total_elapsed_time = metadata.elapsed_before + resume;
        self.view.set_total_progress(ratio(
            book.total_elapsed_time.as_secs() as f64,
            book.total_time.as_secs_f64(),
        ));
        self.view.set_elapsed(resume);
    }
}
