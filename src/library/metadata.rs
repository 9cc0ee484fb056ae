//! Per-file metadata for the now-playing view.
//!
//! `MetadataSource` is the seam the tracker reads through; `LoftyMetadata`
//! is the real implementation backed by `lofty` tag and property parsing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use tracing::debug;

use crate::config::LibrarySettings;

use super::model::FileMetadata;
use super::scan::scan_book_files;

/// Something that can describe an audio file of a book.
pub trait MetadataSource {
    /// Title, subtitle, duration and elapsed-before for `path`, or `None`
    /// when the file cannot be read.
    fn file_metadata(&self, path: &Path) -> Option<FileMetadata>;
}

/// Duration of a single audio file, or `None` when lofty cannot parse it.
pub fn read_duration(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
}

/// Sum of the durations of every file in `files` that sorts before `target`.
fn elapsed_before(
    target: &Path,
    files: &[PathBuf],
    mut duration_of: impl FnMut(&Path) -> Option<Duration>,
) -> Duration {
    files
        .iter()
        .take_while(|f| f.as_path() != target)
        .filter_map(|f| duration_of(f.as_path()))
        .sum()
}

/// `MetadataSource` reading tags with `lofty`.
///
/// Title falls back to the file stem, subtitle to the book directory name.
/// File durations are cached since every lookup needs the durations of all
/// preceding files.
pub struct LoftyMetadata {
    settings: LibrarySettings,
    durations: RefCell<HashMap<PathBuf, Option<Duration>>>,
}

impl LoftyMetadata {
    pub fn new(settings: LibrarySettings) -> Self {
        Self {
            settings,
            durations: RefCell::new(HashMap::new()),
        }
    }

    fn cached_duration(&self, path: &Path) -> Option<Duration> {
        if let Some(d) = self.durations.borrow().get(path) {
            return *d;
        }
        let d = read_duration(path);
        self.durations.borrow_mut().insert(path.to_path_buf(), d);
        d
    }
}

impl MetadataSource for LoftyMetadata {
    fn file_metadata(&self, path: &Path) -> Option<FileMetadata> {
        let tagged = match lofty::read_from_path(path) {
            Ok(t) => t,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "metadata unavailable");
                return None;
            }
        };

        let duration = tagged.properties().duration();
        self.durations
            .borrow_mut()
            .insert(path.to_path_buf(), Some(duration));

        let mut title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let mut subtitle = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = tag.title() {
                if !v.trim().is_empty() {
                    title = v.trim().to_string();
                }
            }
            if let Some(v) = tag.album() {
                if !v.trim().is_empty() {
                    subtitle = v.trim().to_string();
                }
            }
        }

        let siblings = path
            .parent()
            .and_then(|dir| scan_book_files(dir, &self.settings).ok())
            .unwrap_or_default();
        let elapsed_before = elapsed_before(path, &siblings, |p| self.cached_duration(p));

        Some(FileMetadata {
            title,
            subtitle,
            duration,
            elapsed_before,
        })
    }
}
