//! Book records: where each book was left off, and which book is selected.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

use super::model::Book;

/// Persistence for per-book progress.
pub trait BookStore {
    /// Record `book`'s resume point (current file, offset, total elapsed).
    fn update_progress(&mut self, book: &Book) -> Result<()>;

    /// Overwrite `book`'s resume point with the last one saved for its directory.
    fn restore(&self, book: &mut Book);
}

/// One book's saved resume point as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub current_file: Option<String>,
    pub current_progress_ms: u64,
    pub total_elapsed_ms: u64,
}

impl ProgressRecord {
    fn from_book(book: &Book) -> Self {
        Self {
            current_file: book.current_file.clone(),
            current_progress_ms: book.current_progress.as_millis() as u64,
            total_elapsed_ms: book.total_elapsed_time.as_millis() as u64,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    books: BTreeMap<String, ProgressRecord>,
}

fn book_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// TOML-file backed `BookStore`.
///
/// Every update rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written file behind.
pub struct ProgressStore {
    path: PathBuf,
    records: BTreeMap<String, ProgressRecord>,
}

impl ProgressStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<ProgressFile>(&text)?.books,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), books = records.len(), "opened progress store");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, book_path: &Path) -> Option<&ProgressRecord> {
        self.records.get(&book_key(book_path))
    }

    /// Copy the saved resume point (if any) onto `book`.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(rec) = self.record(&book.path) {
            book.current_file = rec.current_file.clone();
            book.current_progress = Duration::from_millis(rec.current_progress_ms);
            book.total_elapsed_time = Duration::from_millis(rec.total_elapsed_ms);
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let doc = ProgressFile {
            books: self.records.clone(),
        };
        let text = toml::to_string_pretty(&doc)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl BookStore for ProgressStore {
    fn update_progress(&mut self, book: &Book) -> Result<()> {
        let rec = ProgressRecord::from_book(book);
        debug!(
            book = %book.path.display(),
            file = rec.current_file.as_deref().unwrap_or("-"),
            progress_ms = rec.current_progress_ms,
            "saving progress"
        );
        self.records.insert(book_key(&book.path), rec);
        self.save()
    }

    fn restore(&self, book: &mut Book) {
        self.apply_to(book);
    }
}

/// Sending half of the "selected book changed" notification.
#[derive(Clone)]
pub struct BookSelection {
    tx: Sender<Book>,
}

impl BookSelection {
    pub fn channel() -> (Self, Receiver<Book>) {
        let (tx, rx) = mpsc::channel::<Book>();
        (Self { tx }, rx)
    }

    /// Announce that `book` is now the selected book.
    pub fn select(&self, book: Book) {
        let _ = self.tx.send(book);
    }
}
