//! Crate-wide error type.
//!
//! Most of the player degrades to a no-op when something is missing (no book,
//! unreadable metadata). The errors here cover the paths that genuinely fail:
//! the filesystem, the audio output, the progress store and configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem access failed (scanning a book, writing progress).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration sources could not be merged or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Configuration deserialized but holds values the player cannot use.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No audio output device could be opened.
    #[error("audio output error: {0}")]
    AudioOutput(String),

    /// A queued file could not be opened or decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The audio thread has exited and no longer accepts commands.
    #[error("audio engine is not running")]
    EngineGone,

    /// The progress file exists but is not valid TOML for our schema.
    #[error("progress store is unreadable: {0}")]
    StoreDecode(#[from] toml::de::Error),

    /// Progress records could not be serialized.
    #[error("progress store could not be written: {0}")]
    StoreEncode(#[from] toml::ser::Error),

    /// A book directory holds no playable files.
    #[error("no playable files in {}", .0.display())]
    EmptyBook(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
