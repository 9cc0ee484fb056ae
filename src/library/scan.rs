use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;
use crate::error::Result;

use super::metadata::read_duration;
use super::model::Book;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Walk the direct children of `dir`. Errors on `dir` itself are returned,
/// errors on individual children are logged and skipped.
fn children(dir: &Path, settings: &LibrarySettings) -> Result<Vec<DirEntry>> {
    let walker = WalkDir::new(dir)
        .follow_links(settings.follow_links)
        .min_depth(1)
        .max_depth(1);

    // min_depth(1) hides the root entry, so probe it explicitly to surface
    // a missing or unreadable directory.
    std::fs::read_dir(dir)?;

    let mut entries = Vec::new();
    for entry in walker {
        match entry {
            Ok(e) => {
                if settings.include_hidden || !is_hidden(e.path()) {
                    entries.push(e);
                }
            }
            Err(err) if err.depth() == 0 => return Err(io::Error::from(err).into()),
            Err(err) => warn!(dir = %dir.display(), error = %err, "skipping unreadable entry"),
        }
    }
    Ok(entries)
}

/// List the playable files of one book directory (non-recursive), ascending by path.
pub fn scan_book_files(dir: &Path, settings: &LibrarySettings) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = children(dir, settings)?
        .into_iter()
        .map(DirEntry::into_path)
        .filter(|p| p.is_file() && is_audio_file(p, settings))
        .collect();

    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "scanned book directory");
    Ok(files)
}

/// First configured cover name that exists inside `dir`.
pub fn find_cover(dir: &Path, settings: &LibrarySettings) -> Option<PathBuf> {
    settings
        .cover_names
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Treat every direct sub-directory of `root` that holds playable files as a book.
///
/// Books come back sorted by title, case-insensitively. Each book's
/// `total_time` is the sum of its files' durations.
pub fn discover_books(root: &Path, settings: &LibrarySettings) -> Result<Vec<Book>> {
    let mut books: Vec<Book> = Vec::new();

    for entry in children(root, settings)? {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let files = match scan_book_files(dir, settings) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable book directory");
                continue;
            }
        };
        if files.is_empty() {
            continue;
        }

        let mut book = Book::new(dir);
        book.total_time = files.iter().filter_map(|f| read_duration(f)).sum();
        book.cover_path = find_cover(dir, settings);
        book.files = files;
        books.push(book);
    }

    books.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
    debug!(root = %root.display(), count = books.len(), "discovered books");
    Ok(books)
}
