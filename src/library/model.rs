use std::path::{Path, PathBuf};
use std::time::Duration;

/// An audiobook: one directory of audio files plus the listener's resume point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Book {
    /// Directory holding the book's audio files.
    pub path: PathBuf,
    /// Display name (the directory name).
    pub title: String,
    /// Playable files, ascending by path. Refreshed every time the book is opened.
    pub files: Vec<PathBuf>,
    /// File name (not path) of the file last played; `None` for a fresh book.
    pub current_file: Option<String>,
    /// Elapsed time within `current_file`.
    pub current_progress: Duration,
    /// Elapsed time across the whole book.
    pub total_elapsed_time: Duration,
    /// Duration of the whole book.
    pub total_time: Duration,
    /// Cover art, if the directory has any.
    pub cover_path: Option<PathBuf>,
}

impl Book {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        Self {
            path,
            title,
            ..Self::default()
        }
    }

    /// Full path of the file playback should resume from: the recorded
    /// `current_file`, else the first file.
    pub fn resume_file_path(&self) -> Option<PathBuf> {
        match &self.current_file {
            Some(name) => Some(self.path.join(name)),
            None => self.files.first().cloned(),
        }
    }

    /// Whether a resume point has been recorded.
    pub fn has_resume_point(&self) -> bool {
        self.current_file.is_some()
    }

    /// Fraction of the book already listened to, for the book list.
    pub fn listened_ratio(&self) -> f64 {
        if self.total_time.is_zero() {
            return 0.0;
        }
        self.total_elapsed_time.as_secs_f64() / self.total_time.as_secs_f64()
    }
}

/// File name component of `path` as an owned string.
pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// What the metadata service knows about one audio file of a book.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMetadata {
    pub title: String,
    pub subtitle: String,
    pub duration: Duration,
    /// Summed duration of every file that precedes this one in the book.
    pub elapsed_before: Duration,
}
