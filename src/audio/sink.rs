//! Utilities for creating `rodio` sinks from queue items.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{Error, Result};

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(handle: &OutputStream, path: &Path, start_at: Duration) -> Result<Sink> {
    let file = File::open(path)?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
        .skip_duration(start_at);

    let sink = Sink::connect_new(handle.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
