//! Application model types: `App`.
//!
//! The `App` struct holds the discovered books, the list selection and the
//! transport state shown by the UI.

use std::path::{Path, PathBuf};

use crate::audio::TransportState;
use crate::library::Book;

/// The main application model.
pub struct App {
    pub books: Vec<Book>,
    pub selected: usize,
    pub playback: TransportState,
    /// Index of the book currently open in the tracker.
    pub open: Option<usize>,
    pub library_root: Option<PathBuf>,
    /// One-line message for the footer (errors opening a book and such).
    pub status: Option<String>,
}

impl App {
    /// Create a new `App` over `books`, in display order.
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books,
            selected: 0,
            playback: TransportState::Stopped,
            open: None,
            library_root: None,
            status: None,
        }
    }

    pub fn set_library_root(&mut self, root: PathBuf) {
        self.library_root = Some(root);
    }

    /// Return true if the library contains any books.
    pub fn has_books(&self) -> bool {
        !self.books.is_empty()
    }

    pub fn selected_book(&self) -> Option<&Book> {
        self.books.get(self.selected)
    }

    pub fn open_book(&self) -> Option<&Book> {
        self.open.and_then(|i| self.books.get(i))
    }

    /// Set the selected index, clamped to the list.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx.min(self.books.len().saturating_sub(1));
    }

    /// Move selection to the next book, wrapping to the first.
    pub fn next(&mut self) {
        if self.books.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.books.len();
    }

    /// Move selection to the previous book, wrapping to the last.
    pub fn prev(&mut self) {
        if self.books.is_empty() {
            return;
        }
        self.selected = match self.selected {
            0 => self.books.len() - 1,
            i => i - 1,
        };
    }

    /// Remember which book the tracker has open.
    pub fn mark_open(&mut self, path: &Path) {
        self.open = self.books.iter().position(|b| b.path == path);
    }

    /// Copy the tracker's view of a book back into the list entry with the
    /// same directory.
    pub fn sync_book(&mut self, book: &Book) {
        if let Some(entry) = self.books.iter_mut().find(|b| b.path == book.path) {
            entry.files = book.files.clone();
            entry.current_file = book.current_file.clone();
            entry.current_progress = book.current_progress;
            entry.total_elapsed_time = book.total_elapsed_time;
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}
