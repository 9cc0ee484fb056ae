//! The media-engine seam.
//!
//! The tracker only talks to playback through `MediaEngine`, so the real
//! rodio-backed `AudioPlayer` and test doubles are interchangeable.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::error::Result;

use super::types::{QueueItem, TransportState};

pub trait MediaEngine {
    fn state(&self) -> TransportState;

    fn is_stopped(&self) -> bool {
        self.state() == TransportState::Stopped
    }

    /// Position within the current queue item.
    fn position(&self) -> Duration;

    fn queue_len(&self) -> usize;

    /// Queue position of the item whose file name is `file_name`.
    fn queue_index_of(&self, file_name: &str) -> Option<usize>;

    fn enqueue(&self, path: PathBuf);

    fn clear_queue(&self);

    /// The item currently loaded (playing or paused), if any.
    fn current_item(&self) -> Option<QueueItem>;

    /// Set the now-playing display text on the current item.
    fn set_current_display(&self, title: &str, subtitle: &str);

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn play_pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn seek_to(&self, position: Duration) -> Result<()>;

    fn step_forward(&self) -> Result<()>;

    fn step_backward(&self) -> Result<()>;

    fn play_next(&self) -> Result<()>;

    fn play_previous(&self) -> Result<()>;

    fn play_queue_item(&self, index: usize) -> Result<()>;

    /// Block until the engine has caught up with every command issued so far.
    ///
    /// Engines that cannot acknowledge readiness just wait `fallback`.
    fn settle(&self, fallback: Duration) -> Result<()> {
        thread::sleep(fallback);
        Ok(())
    }
}
