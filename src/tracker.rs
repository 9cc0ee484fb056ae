//! Playback progress tracking.
//!
//! `PlaybackTracker` sits between the media engine and the UI: it turns
//! engine events into observable now-playing state, periodically saves the
//! current book's resume point, and resumes a book where it was left.

mod progress;
mod timer;
mod view_state;

pub use progress::{NowPlayingTagger, PlaybackTracker};
pub use view_state::{ViewProperty, ViewState};

#[cfg(test)]
mod tests;
