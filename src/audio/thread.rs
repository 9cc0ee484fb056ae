use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, info, warn};

use crate::config::AudioSettings;

use super::queue::{next_position, previous_position};
use super::sink::create_sink_at;
use super::types::{AudioCmd, EngineEvent, PlaybackHandle, QueueHandle, TransportState};

/// State owned by the audio thread.
struct EngineThread {
    stream: OutputStream,
    queue: QueueHandle,
    playback: PlaybackHandle,
    events: Sender<EngineEvent>,
    sink: Option<Sink>,
    state: TransportState,
    // Track start time and accumulated elapsed when paused.
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl EngineThread {
    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    fn current_index(&self) -> Option<usize> {
        self.queue.lock().ok().and_then(|q| q.current)
    }

    fn queue_len(&self) -> usize {
        self.queue.lock().map(|q| q.items.len()).unwrap_or(0)
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state == state {
            return;
        }
        debug!(from = ?self.state, to = ?state, "transport state changed");
        self.state = state;
        self.publish_position();
        self.emit(EngineEvent::StateChanged(state));
    }

    fn publish_position(&self) {
        let position = self.elapsed();
        if let Ok(mut info) = self.playback.lock() {
            info.state = self.state;
            info.position = position;
            info.since = (self.state == TransportState::Playing).then(Instant::now);
        }
        self.emit(EngineEvent::PositionChanged(position));
    }

    fn play_index(&mut self, i: usize) {
        let path = {
            let Ok(q) = self.queue.lock() else {
                return;
            };
            match q.items.get(i) {
                Some(item) => item.path.clone(),
                None => {
                    warn!(index = i, len = q.items.len(), "queue index out of range");
                    return;
                }
            }
        };

        let new_sink = match create_sink_at(&self.stream, &path, Duration::ZERO) {
            Ok(s) => s,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot play queue item");
                self.stop();
                return;
            }
        };

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        new_sink.play();
        self.sink = Some(new_sink);
        self.accumulated = Duration::ZERO;
        self.started_at = Some(Instant::now());

        if let Ok(mut q) = self.queue.lock() {
            q.current = Some(i);
        }
        info!(index = i, path = %path.display(), "playing queue item");
        self.emit(EngineEvent::TrackChanged(i));
        self.set_state(TransportState::Playing);
        self.publish_position();
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        self.set_state(TransportState::Stopped);
        self.publish_position();
    }

    fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        if let Some(ref s) = self.sink {
            s.pause();
        }
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
        self.set_state(TransportState::Paused);
    }

    fn resume(&mut self) {
        if self.state != TransportState::Paused {
            return;
        }
        if let Some(ref s) = self.sink {
            s.play();
        }
        self.started_at = Some(Instant::now());
        self.set_state(TransportState::Playing);
    }

    fn play(&mut self) {
        match self.state {
            TransportState::Paused => self.resume(),
            TransportState::Playing => {}
            TransportState::Stopped => {
                if self.queue_len() > 0 {
                    self.play_index(0);
                }
            }
        }
    }

    /// Scrubbing: rebuild the current sink and skip into the file.
    /// This uses `Source::skip_duration` (works for common formats).
    fn seek_to(&mut self, target: Duration) {
        if self.sink.is_none() {
            return;
        }
        let Some(path) = self
            .queue
            .lock()
            .ok()
            .and_then(|q| q.current_item().map(|item| item.path.clone()))
        else {
            return;
        };

        let new_sink = match create_sink_at(&self.stream, &path, target) {
            Ok(s) => s,
            Err(e) => {
                error!(path = %path.display(), error = %e, "seek failed");
                return;
            }
        };

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if self.state == TransportState::Playing {
            new_sink.play();
            self.started_at = Some(Instant::now());
        } else {
            self.started_at = None;
        }
        self.sink = Some(new_sink);
        self.accumulated = target;
        debug!(position_ms = target.as_millis() as u64, "seeked");
        self.publish_position();
    }

    fn next(&mut self) {
        match next_position(self.current_index(), self.queue_len()) {
            Some(i) => self.play_index(i),
            None => debug!("already at the last queue item"),
        }
    }

    fn prev(&mut self) {
        if let Some(i) = previous_position(self.current_index(), self.queue_len()) {
            self.play_index(i);
        }
    }

    /// Periodic housekeeping: auto-advance at end of file, publish position.
    fn tick(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        let finished = self.sink.as_ref().map(Sink::empty).unwrap_or(false);
        if !finished {
            self.publish_position();
            return;
        }

        match next_position(self.current_index(), self.queue_len()) {
            Some(i) => self.play_index(i),
            None => {
                info!("reached the end of the queue");
                self.stop();
            }
        }
    }

    fn quit(&mut self, fade_out_ms: u64) {
        if let Some(ref s) = self.sink {
            // Fade out gently before stopping.
            fade_out_sink(s, fade_out_ms);
            s.stop();
        }
        self.sink = None;
        // Update shared state so UI/MPRIS don't keep showing Playing.
        if let Ok(mut info) = self.playback.lock() {
            info.state = TransportState::Stopped;
            info.since = None;
        }
    }
}

fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    sink.set_volume(1.0);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(1.0 - t);
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}

/// Spawn the audio thread. `ready` receives `Ok` once the output device is
/// open, or the reason it could not be opened.
pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    queue: QueueHandle,
    playback: PlaybackHandle,
    events: Sender<EngineEvent>,
    audio_settings: AudioSettings,
    ready: Sender<Result<(), String>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(s) => s,
            Err(e) => {
                let _ = ready.send(Err(e.to_string()));
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped, which would
        // scribble over the TUI.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));

        let mut engine = EngineThread {
            stream,
            queue,
            playback,
            events,
            sink: None,
            state: TransportState::Stopped,
            started_at: None,
            accumulated: Duration::ZERO,
        };

        let tick = Duration::from_millis(audio_settings.position_update_ms.max(1));
        loop {
            match rx.recv_timeout(tick) {
                Ok(cmd) => match cmd {
                    AudioCmd::Play => engine.play(),
                    AudioCmd::Pause => engine.pause(),
                    AudioCmd::TogglePause => match engine.state {
                        TransportState::Playing => engine.pause(),
                        TransportState::Paused => engine.resume(),
                        TransportState::Stopped => engine.play(),
                    },
                    AudioCmd::Stop => engine.stop(),
                    AudioCmd::PlayIndex(i) => engine.play_index(i),
                    AudioCmd::Next => engine.next(),
                    AudioCmd::Prev => engine.prev(),
                    AudioCmd::SeekTo(target) => engine.seek_to(target),
                    AudioCmd::StepForward(d) => {
                        let target = engine.elapsed() + d;
                        engine.seek_to(target);
                    }
                    AudioCmd::StepBack(d) => {
                        let target = engine.elapsed().saturating_sub(d);
                        engine.seek_to(target);
                    }
                    AudioCmd::Ping(ack) => {
                        let _ = ack.send(());
                    }
                    AudioCmd::Quit { fade_out_ms } => {
                        engine.quit(fade_out_ms);
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => engine.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("audio thread exiting");
    })
}
