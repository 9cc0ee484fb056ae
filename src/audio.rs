//! Audio playback: the `MediaEngine` seam and its rodio implementation.
//!
//! `AudioPlayer` owns a dedicated thread holding the output stream. Commands
//! travel over a channel, the queue and playback snapshot are shared behind
//! mutexes, and the thread reports state, position and track changes as
//! `EngineEvent`s.

mod engine;
mod player;
mod queue;
mod sink;
mod thread;
mod types;

pub use engine::MediaEngine;
pub use player::AudioPlayer;
pub use types::*;
