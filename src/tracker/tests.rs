use super::*;
use crate::audio::{EngineEvent, MediaEngine, QueueItem, TransportState};
use crate::config::{LibrarySettings, PlaybackSettings};
use crate::error::Result;
use crate::library::{Book, BookStore, FileMetadata, MetadataSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tempfile::{TempDir, tempdir};

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Play,
    Pause,
    PlayPause,
    Stop,
    SeekTo(Duration),
    StepForward,
    StepBackward,
    Next,
    Previous,
    PlayQueueItem(usize),
    Settle,
}

#[derive(Default)]
struct FakeEngineState {
    state: TransportState,
    position: Duration,
    queue: Vec<QueueItem>,
    current: Option<usize>,
    calls: Vec<Call>,
}

#[derive(Default)]
struct FakeEngine {
    inner: RefCell<FakeEngineState>,
}

impl FakeEngine {
    fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    fn set_state(&self, state: TransportState) {
        self.inner.borrow_mut().state = state;
    }

    fn set_position(&self, position: Duration) {
        self.inner.borrow_mut().position = position;
    }

    fn set_current(&self, index: Option<usize>) {
        self.inner.borrow_mut().current = index;
    }

    fn record(&self, call: Call) -> Result<()> {
        self.inner.borrow_mut().calls.push(call);
        Ok(())
    }
}

impl MediaEngine for FakeEngine {
    fn state(&self) -> TransportState {
        self.inner.borrow().state
    }

    fn position(&self) -> Duration {
        self.inner.borrow().position
    }

    fn queue_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    fn queue_index_of(&self, file_name: &str) -> Option<usize> {
        self.inner
            .borrow()
            .queue
            .iter()
            .position(|item| item.path.file_name().and_then(|s| s.to_str()) == Some(file_name))
    }

    fn enqueue(&self, path: PathBuf) {
        self.inner.borrow_mut().queue.push(QueueItem::new(path));
    }

    fn clear_queue(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.queue.clear();
        inner.current = None;
    }

    fn current_item(&self) -> Option<QueueItem> {
        let inner = self.inner.borrow();
        inner.current.and_then(|i| inner.queue.get(i).cloned())
    }

    fn set_current_display(&self, title: &str, subtitle: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(i) = inner.current {
            if let Some(item) = inner.queue.get_mut(i) {
                item.display_title = Some(title.to_string());
                item.display_subtitle = Some(subtitle.to_string());
            }
        }
    }

    fn play(&self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state == TransportState::Stopped && !inner.queue.is_empty() {
                inner.current = Some(0);
            }
            inner.state = TransportState::Playing;
        }
        self.record(Call::Play)
    }

    fn pause(&self) -> Result<()> {
        self.record(Call::Pause)
    }

    fn play_pause(&self) -> Result<()> {
        self.record(Call::PlayPause)
    }

    fn stop(&self) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = TransportState::Stopped;
            inner.position = Duration::ZERO;
        }
        self.record(Call::Stop)
    }

    fn seek_to(&self, position: Duration) -> Result<()> {
        self.record(Call::SeekTo(position))
    }

    fn step_forward(&self) -> Result<()> {
        self.record(Call::StepForward)
    }

    fn step_backward(&self) -> Result<()> {
        self.record(Call::StepBackward)
    }

    fn play_next(&self) -> Result<()> {
        self.record(Call::Next)
    }

    fn play_previous(&self) -> Result<()> {
        self.record(Call::Previous)
    }

    fn play_queue_item(&self, index: usize) -> Result<()> {
        self.inner.borrow_mut().current = Some(index);
        self.record(Call::PlayQueueItem(index))
    }

    fn settle(&self, _fallback: Duration) -> Result<()> {
        self.record(Call::Settle)
    }
}

#[derive(Default)]
struct FakeMetadata {
    by_path: HashMap<PathBuf, FileMetadata>,
    requested: RefCell<Vec<PathBuf>>,
}

impl FakeMetadata {
    fn with(mut self, path: PathBuf, meta: FileMetadata) -> Self {
        self.by_path.insert(path, meta);
        self
    }
}

impl MetadataSource for FakeMetadata {
    fn file_metadata(&self, path: &Path) -> Option<FileMetadata> {
        self.requested.borrow_mut().push(path.to_path_buf());
        self.by_path.get(path).cloned()
    }
}

#[derive(Default)]
struct FakeStore {
    saved: Vec<Book>,
}

impl BookStore for FakeStore {
    fn update_progress(&mut self, book: &Book) -> Result<()> {
        self.saved.push(book.clone());
        Ok(())
    }

    fn restore(&self, book: &mut Book) {
        if let Some(saved) = self.saved.iter().rev().find(|b| b.path == book.path) {
            book.current_file = saved.current_file.clone();
            book.current_progress = saved.current_progress;
            book.total_elapsed_time = saved.total_elapsed_time;
        }
    }
}

#[derive(Default)]
struct FakeTagger {
    tagged: RefCell<Vec<(Option<String>, String)>>,
}

impl NowPlayingTagger for FakeTagger {
    fn add_metadata(&self, item: &QueueItem, subtitle: &str) {
        self.tagged
            .borrow_mut()
            .push((item.display_title.clone(), subtitle.to_string()));
    }
}

type Tracker = PlaybackTracker<FakeEngine, FakeMetadata, FakeStore, FakeTagger>;

fn meta(title: &str, duration_secs: u64, elapsed_before_secs: u64) -> FileMetadata {
    FileMetadata {
        title: title.to_string(),
        subtitle: "Dune".to_string(),
        duration: Duration::from_secs(duration_secs),
        elapsed_before: Duration::from_secs(elapsed_before_secs),
    }
}

/// A book directory holding `names` as (fake) audio files.
fn book_dir(names: &[&str]) -> (TempDir, Book) {
    let dir = tempdir().unwrap();
    for name in names {
        fs::write(dir.path().join(name), b"not audio").unwrap();
    }
    let book = Book::new(dir.path());
    (dir, book)
}

fn tracker_with(metadata: FakeMetadata) -> Tracker {
    PlaybackTracker::new(
        FakeEngine::default(),
        metadata,
        FakeStore::default(),
        FakeTagger::default(),
        &PlaybackSettings::default(),
        LibrarySettings::default(),
    )
}

fn drain(rx: &Receiver<ViewProperty>) -> Vec<ViewProperty> {
    rx.try_iter().collect()
}

#[test]
fn opening_no_book_leaves_view_untouched() {
    let mut tracker = tracker_with(FakeMetadata::default());
    let rx = tracker.view_mut().subscribe();

    tracker.open_book(None).unwrap();

    assert!(drain(&rx).is_empty());
    assert!(!tracker.view().is_book_open());
    assert!(tracker.current_book().is_none());
}

#[test]
fn opening_scans_sorted_playable_files_and_loads_first_file() {
    let (dir, book) = book_dir(&["b.mp3", "a.mp3", "c.txt"]);
    let first = dir.path().join("a.mp3");
    let mut tracker = tracker_with(FakeMetadata::default().with(first.clone(), meta("A", 60, 0)));

    tracker.open_book(Some(book)).unwrap();

    let book = tracker.current_book().unwrap();
    assert_eq!(book.files, vec![first.clone(), dir.path().join("b.mp3")]);
    assert_eq!(*tracker.metadata().requested.borrow(), vec![first]);
    assert_eq!(tracker.view().current_title(), "A");
    assert!(tracker.view().is_book_open());
}

#[test]
fn opening_with_resume_file_loads_that_file() {
    let (dir, mut book) = book_dir(&["01.mp3", "02.mp3", "03.mp3"]);
    book.current_file = Some("02.mp3".to_string());
    let mut tracker = tracker_with(FakeMetadata::default());

    tracker.open_book(Some(book)).unwrap();

    assert_eq!(
        *tracker.metadata().requested.borrow(),
        vec![dir.path().join("02.mp3")]
    );
}

#[test]
fn opening_sets_cover_and_clears_queue() {
    let (dir, mut book) = book_dir(&["01.mp3"]);
    book.cover_path = Some(dir.path().join("cover.jpg"));
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.engine().enqueue(PathBuf::from("/other/book/01.mp3"));

    tracker.open_book(Some(book)).unwrap();

    assert_eq!(tracker.engine().queue_len(), 0);
    assert_eq!(
        tracker.view().book_cover_path(),
        Some(dir.path().join("cover.jpg").as_path())
    );
}

#[test]
fn opening_a_directory_without_audio_is_an_error() {
    let (_dir, book) = book_dir(&["notes.txt"]);
    let mut tracker = tracker_with(FakeMetadata::default());

    assert!(tracker.open_book(Some(book)).is_err());
    assert!(!tracker.view().is_book_open());
}

#[test]
fn resume_offset_over_file_duration_gives_current_progress() {
    let (dir, mut book) = book_dir(&["01.mp3"]);
    book.current_file = Some("01.mp3".to_string());
    book.current_progress = Duration::from_secs(30);
    book.total_time = Duration::from_secs(240);
    let mut tracker =
        tracker_with(FakeMetadata::default().with(dir.path().join("01.mp3"), meta("One", 120, 0)));

    tracker.open_book(Some(book)).unwrap();

    assert_eq!(tracker.view().current_progress(), 0.25);
    assert_eq!(tracker.view().elapsed(), Duration::from_secs(30));
    assert_eq!(tracker.view().duration(), Duration::from_secs(120));
    assert_eq!(tracker.view().total_progress(), 30.0 / 240.0);
}

#[test]
fn total_progress_counts_whole_seconds_of_cumulative_elapsed() {
    let (dir, mut book) = book_dir(&["01.mp3", "02.mp3"]);
    book.current_file = Some("02.mp3".to_string());
    book.current_progress = Duration::from_millis(30_900);
    book.total_time = Duration::from_secs(180);
    let mut tracker =
        tracker_with(FakeMetadata::default().with(dir.path().join("02.mp3"), meta("Two", 120, 60)));

    tracker.open_book(Some(book)).unwrap();

    let book = tracker.current_book().unwrap();
    assert_eq!(book.total_elapsed_time, Duration::from_millis(90_900));
    assert_eq!(tracker.view().total_progress(), 0.5);
}

#[test]
fn play_from_stop_without_resume_point_starts_at_top() {
    let (_dir, book) = book_dir(&["01.mp3", "02.mp3"]);
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(book)).unwrap();

    tracker.play_or_pause().unwrap();

    assert_eq!(tracker.engine().queue_len(), 2);
    assert_eq!(tracker.engine().calls(), vec![Call::Play]);
}

#[test]
fn play_from_stop_resumes_saved_file_slightly_early() {
    let (_dir, mut book) = book_dir(&["01.mp3", "02.mp3", "03.mp3"]);
    book.current_file = Some("02.mp3".to_string());
    book.current_progress = Duration::from_secs(95);
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(book)).unwrap();

    tracker.play_or_pause().unwrap();

    assert_eq!(
        tracker.engine().calls(),
        vec![
            Call::Play,
            Call::Settle,
            Call::PlayQueueItem(1),
            Call::Settle,
            Call::SeekTo(Duration::from_secs(85)),
        ]
    );
}

#[test]
fn resume_rewind_does_not_go_before_start_of_file() {
    let (_dir, mut book) = book_dir(&["01.mp3", "02.mp3"]);
    book.current_file = Some("02.mp3".to_string());
    book.current_progress = Duration::from_secs(4);
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(book)).unwrap();

    tracker.play_or_pause().unwrap();

    assert_eq!(
        tracker.engine().calls().last(),
        Some(&Call::SeekTo(Duration::ZERO))
    );
}

#[test]
fn play_with_vanished_resume_file_starts_over() {
    let (_dir, mut book) = book_dir(&["01.mp3"]);
    book.current_file = Some("99.mp3".to_string());
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(book)).unwrap();

    tracker.play_or_pause().unwrap();

    assert_eq!(tracker.engine().calls(), vec![Call::Play]);
}

#[test]
fn play_or_pause_toggles_when_not_stopped() {
    let (_dir, book) = book_dir(&["01.mp3"]);
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(book)).unwrap();
    tracker.engine().set_state(TransportState::Playing);

    tracker.play_or_pause().unwrap();

    assert_eq!(tracker.engine().calls(), vec![Call::PlayPause]);
    assert_eq!(tracker.engine().queue_len(), 0);
}

#[test]
fn play_or_pause_without_book_does_nothing() {
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.play_or_pause().unwrap();
    assert!(tracker.engine().calls().is_empty());
}

#[test]
fn seek_to_fraction_of_current_file() {
    let (dir, book) = book_dir(&["01.mp3"]);
    let mut tracker =
        tracker_with(FakeMetadata::default().with(dir.path().join("01.mp3"), meta("One", 120, 0)));
    tracker.open_book(Some(book)).unwrap();

    tracker.seek_to(0.5).unwrap();

    assert_eq!(tracker.view().elapsed(), Duration::from_secs(60));
    assert_eq!(
        tracker.engine().calls(),
        vec![Call::SeekTo(Duration::from_secs(60))]
    );
}

#[test]
fn transport_shortcuts_delegate_to_engine() {
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.jump_back().unwrap();
    tracker.jump_forward().unwrap();
    tracker.play_previous_file().unwrap();
    tracker.play_next_file().unwrap();
    assert_eq!(
        tracker.engine().calls(),
        vec![
            Call::StepBackward,
            Call::StepForward,
            Call::Previous,
            Call::Next
        ]
    );
}

/// An open book whose first file is loaded in the engine.
fn playing_tracker() -> (TempDir, Tracker) {
    let (dir, book) = book_dir(&["01.mp3", "02.mp3"]);
    let metadata = FakeMetadata::default()
        .with(dir.path().join("01.mp3"), meta("One", 120, 0))
        .with(dir.path().join("02.mp3"), meta("Two", 120, 120));
    let mut tracker = tracker_with(metadata);
    tracker.open_book(Some(book)).unwrap();
    tracker.play_or_pause().unwrap();
    (dir, tracker)
}

#[test]
fn pausing_at_zero_position_never_persists() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.engine().set_position(Duration::ZERO);

    tracker.handle_engine_event(
        EngineEvent::StateChanged(TransportState::Paused),
        Instant::now(),
    );

    assert!(tracker.store().saved.is_empty());
    assert_eq!(
        tracker.current_book().unwrap().current_file.as_deref(),
        Some("01.mp3")
    );
}

#[test]
fn pausing_persists_nonzero_position_and_stops_timer() {
    let (_dir, mut tracker) = playing_tracker();
    let now = Instant::now();
    tracker.handle_engine_event(EngineEvent::StateChanged(TransportState::Playing), now);
    assert!(tracker.timer_enabled());
    assert!(tracker.view().is_playing());

    tracker.engine().set_position(Duration::from_secs(42));
    tracker.handle_engine_event(EngineEvent::StateChanged(TransportState::Paused), now);

    assert!(!tracker.timer_enabled());
    assert!(!tracker.view().is_playing());
    let saved = &tracker.store().saved;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].current_file.as_deref(), Some("01.mp3"));
    assert_eq!(saved[0].current_progress, Duration::from_secs(42));
}

#[test]
fn periodic_tick_persists_while_playing() {
    let (_dir, mut tracker) = playing_tracker();
    let t0 = Instant::now();
    tracker.handle_engine_event(EngineEvent::StateChanged(TransportState::Playing), t0);
    tracker.engine().set_position(Duration::from_secs(31));

    tracker.poll_timer(t0 + Duration::from_secs(29));
    assert!(tracker.store().saved.is_empty());

    tracker.poll_timer(t0 + Duration::from_secs(30));
    assert_eq!(tracker.store().saved.len(), 1);
    assert_eq!(
        tracker.store().saved[0].current_progress,
        Duration::from_secs(31)
    );
}

#[test]
fn stopping_stops_timer_without_saving() {
    let (_dir, mut tracker) = playing_tracker();
    let now = Instant::now();
    tracker.handle_engine_event(EngineEvent::StateChanged(TransportState::Playing), now);
    tracker.handle_engine_event(EngineEvent::StateChanged(TransportState::Stopped), now);

    assert!(!tracker.timer_enabled());
    assert!(tracker.store().saved.is_empty());
}

#[test]
fn position_events_update_elapsed_and_ratios() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.handle_engine_event(
        EngineEvent::PositionChanged(Duration::from_secs(30)),
        Instant::now(),
    );

    assert_eq!(tracker.view().elapsed(), Duration::from_secs(30));
    assert_eq!(tracker.view().current_progress(), 0.25);
}

#[test]
fn track_advance_loads_new_file_and_tags_now_playing() {
    let (dir, mut tracker) = playing_tracker();
    tracker.engine().set_current(Some(1));

    tracker.handle_engine_event(EngineEvent::TrackChanged(1), Instant::now());

    assert_eq!(tracker.view().current_title(), "Two");
    assert_eq!(tracker.view().elapsed(), Duration::ZERO);
    let book = tracker.current_book().unwrap();
    assert_eq!(book.current_file.as_deref(), Some("02.mp3"));
    assert_eq!(book.total_elapsed_time, Duration::from_secs(120));
    assert_eq!(
        tracker.engine().current_item().unwrap().display_title.as_deref(),
        Some("Two")
    );
    assert_eq!(
        tracker.tagger().tagged.borrow().last(),
        Some(&(Some("Two".to_string()), "Dune".to_string()))
    );
    assert_eq!(
        *tracker.metadata().requested.borrow().last().unwrap(),
        dir.path().join("02.mp3")
    );
}

#[test]
fn selecting_another_book_saves_stops_and_opens_it() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.engine().set_position(Duration::from_secs(12));
    let (_other_dir, other) = book_dir(&["x.mp3"]);
    let other_path = other.path.clone();

    tracker.on_selected_book_changed(other).unwrap();

    assert_eq!(tracker.store().saved.len(), 1);
    assert_eq!(tracker.store().saved[0].current_progress, Duration::from_secs(12));
    assert!(tracker.engine().calls().contains(&Call::Stop));
    assert_eq!(tracker.current_book().unwrap().path, other_path);
    assert_eq!(tracker.engine().queue_len(), 0);
}

#[test]
fn explicit_stop_saves_before_stopping_engine() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.handle_engine_event(
        EngineEvent::StateChanged(TransportState::Playing),
        Instant::now(),
    );
    tracker.engine().set_position(Duration::from_secs(7));

    tracker.stop().unwrap();

    assert_eq!(tracker.store().saved.len(), 1);
    assert!(!tracker.timer_enabled());
    assert_eq!(tracker.engine().calls().last(), Some(&Call::Stop));
}

#[test]
fn shutdown_flushes_progress_once() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.engine().set_position(Duration::from_secs(3));
    tracker.shutdown();
    assert_eq!(tracker.store().saved.len(), 1);
}

#[test]
fn position_events_refresh_total_progress_from_elapsed_before() {
    let (dir, mut book) = book_dir(&["01.mp3", "02.mp3"]);
    book.current_file = Some("02.mp3".to_string());
    book.total_time = Duration::from_secs(240);
    let metadata =
        FakeMetadata::default().with(dir.path().join("02.mp3"), meta("Two", 120, 120));
    let mut tracker = tracker_with(metadata);
    tracker.open_book(Some(book)).unwrap();
    tracker.play_or_pause().unwrap();
    assert_eq!(tracker.view().total_progress(), 0.5);

    tracker.handle_engine_event(
        EngineEvent::PositionChanged(Duration::from_secs(60)),
        Instant::now(),
    );

    assert_eq!(tracker.view().current_progress(), 0.5);
    assert_eq!(tracker.view().total_progress(), 180.0 / 240.0);
}

#[test]
fn position_events_after_queue_clear_are_ignored() {
    let (_dir, mut tracker) = playing_tracker();
    tracker.engine().clear_queue();
    let rx = tracker.view_mut().subscribe();

    tracker.handle_engine_event(
        EngineEvent::PositionChanged(Duration::from_secs(45)),
        Instant::now(),
    );

    assert!(drain(&rx).is_empty());
    assert_eq!(tracker.view().elapsed(), Duration::ZERO);
}

#[test]
fn reselecting_a_book_resumes_where_it_was_left() {
    let (a_dir, a) = book_dir(&["01.mp3", "02.mp3", "03.mp3"]);
    let (_b_dir, b) = book_dir(&["x.mp3"]);
    // The list entry never saw a resume point.
    let listed_a = a.clone();
    let mut tracker = tracker_with(FakeMetadata::default());

    tracker.on_selected_book_changed(a).unwrap();
    tracker.play_or_pause().unwrap();
    tracker.engine().set_current(Some(1));
    tracker.engine().set_position(Duration::from_secs(95));

    tracker.on_selected_book_changed(b).unwrap();
    tracker.on_selected_book_changed(listed_a).unwrap();

    let book = tracker.current_book().unwrap();
    assert_eq!(book.path, a_dir.path());
    assert_eq!(book.current_file.as_deref(), Some("02.mp3"));
    assert_eq!(book.current_progress, Duration::from_secs(95));

    tracker.play_or_pause().unwrap();
    let calls = tracker.engine().calls();
    assert_eq!(
        calls[calls.len() - 3..],
        [
            Call::PlayQueueItem(1),
            Call::Settle,
            Call::SeekTo(Duration::from_secs(85)),
        ]
    );
}

#[test]
fn reopening_the_open_book_keeps_unsaved_position() {
    let (_dir, a) = book_dir(&["01.mp3", "02.mp3"]);
    let listed_a = a.clone();
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(a)).unwrap();
    tracker.play_or_pause().unwrap();
    tracker.engine().set_position(Duration::from_secs(20));

    tracker.on_selected_book_changed(listed_a).unwrap();

    let book = tracker.current_book().unwrap();
    assert_eq!(book.current_file.as_deref(), Some("01.mp3"));
    assert_eq!(book.current_progress, Duration::from_secs(20));
}

#[test]
fn missing_book_directory_keeps_current_book() {
    let (dir, a) = book_dir(&["01.mp3"]);
    let mut tracker = tracker_with(FakeMetadata::default());
    tracker.open_book(Some(a)).unwrap();

    let gone = Book::new(dir.path().join("unmounted"));
    let err = tracker.on_selected_book_changed(gone).unwrap_err();

    assert!(matches!(err, crate::error::Error::Io(_)));
    assert_eq!(tracker.current_book().unwrap().path, dir.path());
    assert!(tracker.view().is_book_open());
}
