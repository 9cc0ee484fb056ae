//! The audiobook library: books on disk, their files, per-file metadata and
//! the saved resume points.
//!
//! A book is a directory of audio files. `scan` finds books and their files,
//! `metadata` reads tags with `lofty`, `store` persists progress as TOML.

mod metadata;
mod model;
mod scan;
mod store;

pub use metadata::{LoftyMetadata, MetadataSource};
pub use model::{Book, FileMetadata, file_name_of};
pub use scan::{discover_books, scan_book_files};
pub use store::{BookSelection, BookStore, ProgressStore};
