use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/bookend/config.toml` or `~/.config/bookend/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `BOOKEND__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub audio: AudioSettings,
    pub store: StoreSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory whose sub-directories are audiobooks.
    /// When unset, the first CLI argument or the working directory is used.
    pub root: Option<PathBuf>,
    /// File extensions to treat as playable (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks while scanning.
    pub follow_links: bool,
    /// Whether to include hidden book directories and files (dotfiles).
    pub include_hidden: bool,
    /// File names probed, in order, for a book's cover art.
    pub cover_names: Vec<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            root: None,
            extensions: vec!["mp3".into()],
            follow_links: true,
            include_hidden: false,
            cover_names: vec![
                "cover.jpg".into(),
                "cover.png".into(),
                "folder.jpg".into(),
                "folder.png".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often progress is written while playing (seconds).
    pub progress_interval_secs: u64,
    /// Size of a jump back / forward (seconds).
    pub step_secs: u64,
    /// How far before the saved position playback resumes (seconds).
    pub resume_rewind_secs: u64,
    /// Fallback pause between engine calls while resuming, used when the
    /// engine cannot acknowledge readiness itself (milliseconds).
    pub settle_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            progress_interval_secs: 30,
            step_secs: 10,
            resume_rewind_secs: 10,
            settle_ms: 40,
        }
    }
}

impl PlaybackSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn resume_rewind(&self) -> Duration {
        Duration::from_secs(self.resume_rewind_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// How often the audio thread publishes the playback position (milliseconds).
    pub position_update_ms: u64,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            position_update_ms: 250,
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Where per-book progress is kept. Defaults to
    /// `$XDG_DATA_HOME/bookend/progress.toml`.
    pub progress_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Whether to show the cover art path in the now-playing box.
    pub show_cover_path: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ pick up where you left off ~ ".to_string(),
            show_cover_path: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Log file. Defaults to `$XDG_STATE_HOME/bookend/bookend.log`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
