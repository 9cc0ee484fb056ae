//! Audio-related small types and handles.
//!
//! This module defines the transport state, the queue, the commands sent to
//! the audio thread, the events it reports back and the shared handles.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Transport state as reported by the engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// One playable file in the engine queue.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueItem {
    pub path: PathBuf,
    /// Now-playing title shown by the desktop (set once metadata is known).
    pub display_title: Option<String>,
    pub display_subtitle: Option<String>,
}

impl QueueItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            display_title: None,
            display_subtitle: None,
        }
    }
}

/// Ordered queue plus the position of the item currently loaded.
#[derive(Clone, Debug, Default)]
pub struct Queue {
    pub items: Vec<QueueItem>,
    pub current: Option<usize>,
}

impl Queue {
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn current_item_mut(&mut self) -> Option<&mut QueueItem> {
        self.current.and_then(|i| self.items.get_mut(i))
    }
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Resume if paused, otherwise start the current (or first) queue item.
    Play,
    /// Pause if playing.
    Pause,
    /// Toggle pause/resume.
    TogglePause,
    /// Stop playback; the current item stays selected at position zero.
    Stop,
    /// Start playing the queue item at the given position.
    PlayIndex(usize),
    /// Skip to the next queue item.
    Next,
    /// Go to the previous queue item (restarts the first one).
    Prev,
    /// Seek to an absolute offset within the current item.
    SeekTo(Duration),
    /// Seek relative to the current position.
    StepForward(Duration),
    StepBack(Duration),
    /// Acknowledge once every earlier command has been processed.
    Ping(Sender<()>),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// What the audio thread reports to whoever drives the tracker.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    StateChanged(TransportState),
    PositionChanged(Duration),
    /// The queue item at this position became the current one.
    TrackChanged(usize),
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    pub state: TransportState,
    /// Position within the current item at the instant `since`.
    pub position: Duration,
    /// When `position` was sampled; only set while playing.
    pub since: Option<Instant>,
}

impl PlaybackInfo {
    /// Position extrapolated to now.
    pub fn current_position(&self) -> Duration {
        match self.since {
            Some(at) if self.state == TransportState::Playing => self.position + at.elapsed(),
            _ => self.position,
        }
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
pub type QueueHandle = Arc<Mutex<Queue>>;
