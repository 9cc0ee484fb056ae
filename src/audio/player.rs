use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::config::AudioSettings;
use crate::error::{Error, Result};

use super::engine::MediaEngine;
use super::queue::index_of_file;
use super::thread::spawn_audio_thread;
use super::types::{
    AudioCmd, EngineEvent, PlaybackHandle, PlaybackInfo, Queue, QueueHandle, QueueItem,
    TransportState,
};

/// Upper bound on how long `settle` waits for the audio thread, as a
/// multiple of the configured fallback delay.
const SETTLE_TIMEOUT_FACTOR: u32 = 25;

/// Handle to the rodio-backed audio thread.
///
/// Transport commands go over a channel; the queue and the playback snapshot
/// are shared with the thread behind mutexes.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    playback: PlaybackHandle,
    queue: QueueHandle,
    step: Duration,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Open the default output device and start the audio thread.
    ///
    /// Returns the player and the receiving end of its event channel.
    pub fn new(
        audio_settings: AudioSettings,
        step: Duration,
    ) -> Result<(Self, Receiver<EngineEvent>)> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>();
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();
        let playback: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));
        let queue: QueueHandle = Arc::new(Mutex::new(Queue::default()));

        let audio_handle = spawn_audio_thread(
            rx,
            queue.clone(),
            playback.clone(),
            event_tx,
            audio_settings,
            ready_tx,
        );

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(Error::AudioOutput(reason)),
            Err(_) => return Err(Error::EngineGone),
        }

        let player = Self {
            tx,
            playback,
            queue,
            step,
            join: Mutex::new(Some(audio_handle)),
        };
        Ok((player, event_rx))
    }

    fn send(&self, cmd: AudioCmd) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::EngineGone)
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl MediaEngine for AudioPlayer {
    fn state(&self) -> TransportState {
        self.playback
            .lock()
            .map(|info| info.state)
            .unwrap_or_default()
    }

    fn position(&self) -> Duration {
        self.playback
            .lock()
            .map(|info| info.current_position())
            .unwrap_or_default()
    }

    fn queue_len(&self) -> usize {
        self.queue.lock().map(|q| q.items.len()).unwrap_or(0)
    }

    fn queue_index_of(&self, file_name: &str) -> Option<usize> {
        self.queue
            .lock()
            .ok()
            .and_then(|q| index_of_file(&q.items, file_name))
    }

    fn enqueue(&self, path: PathBuf) {
        if let Ok(mut q) = self.queue.lock() {
            q.items.push(QueueItem::new(path));
        }
    }

    fn clear_queue(&self) {
        if let Ok(mut q) = self.queue.lock() {
            q.items.clear();
            q.current = None;
        }
    }

    fn current_item(&self) -> Option<QueueItem> {
        self.queue
            .lock()
            .ok()
            .and_then(|q| q.current_item().cloned())
    }

    fn set_current_display(&self, title: &str, subtitle: &str) {
        if let Ok(mut q) = self.queue.lock() {
            if let Some(item) = q.current_item_mut() {
                item.display_title = Some(title.to_string());
                item.display_subtitle = Some(subtitle.to_string());
            }
        }
    }

    fn play(&self) -> Result<()> {
        self.send(AudioCmd::Play)
    }

    fn pause(&self) -> Result<()> {
        self.send(AudioCmd::Pause)
    }

    fn play_pause(&self) -> Result<()> {
        self.send(AudioCmd::TogglePause)
    }

    fn stop(&self) -> Result<()> {
        self.send(AudioCmd::Stop)
    }

    fn seek_to(&self, position: Duration) -> Result<()> {
        self.send(AudioCmd::SeekTo(position))
    }

    fn step_forward(&self) -> Result<()> {
        self.send(AudioCmd::StepForward(self.step))
    }

    fn step_backward(&self) -> Result<()> {
        self.send(AudioCmd::StepBack(self.step))
    }

    fn play_next(&self) -> Result<()> {
        self.send(AudioCmd::Next)
    }

    fn play_previous(&self) -> Result<()> {
        self.send(AudioCmd::Prev)
    }

    fn play_queue_item(&self, index: usize) -> Result<()> {
        self.send(AudioCmd::PlayIndex(index))
    }

    /// Round-trip a ping through the command channel; the audio thread
    /// answers only after handling everything queued before it.
    fn settle(&self, fallback: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel::<()>();
        self.send(AudioCmd::Ping(ack_tx))?;

        let timeout = fallback.max(Duration::from_millis(1)) * SETTLE_TIMEOUT_FACTOR;
        match ack_rx.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "audio thread slow to settle");
                Ok(())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::EngineGone),
        }
    }
}
