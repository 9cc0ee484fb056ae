//! Desktop media controls over D-Bus (MPRIS).
//!
//! Desktop transport requests arrive as `ControlCmd`s on a channel; the
//! runtime pushes playback state and now-playing text into a shared snapshot
//! that the D-Bus properties read from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::Sender};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{info, warn};
use zbus::{connection, interface};
use zvariant::{OwnedValue, Value};

use crate::audio::{QueueItem, TransportState};
use crate::tracker::NowPlayingTagger;


const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.bookend";

/// Transport requests coming from desktop media controls.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
}

#[derive(Debug, Default)]
struct SharedState {
    playback: TransportState,
    title: Option<String>,
    album: Option<String>,
}

impl SharedState {
    /// `xesam:` metadata map; the title is always present.
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let title = Some(self.title.clone().unwrap_or_default());
        [("xesam:title", title), ("xesam:album", self.album.clone())]
            .into_iter()
            .filter_map(|(key, value)| {
                let value = OwnedValue::try_from(Value::from(value?)).ok()?;
                Some((key.to_string(), value))
            })
            .collect()
    }
}

/// MPRIS `PlaybackStatus` name for a transport state.
fn status_name(state: TransportState) -> &'static str {
    match state {
        TransportState::Stopped => "Stopped",
        TransportState::Playing => "Playing",
        TransportState::Paused => "Paused",
    }
}

#[derive(Clone)]
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: TransportState) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = playback;
        }
    }
}

impl NowPlayingTagger for MprisHandle {
    fn add_metadata(&self, item: &QueueItem, subtitle: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.title = item.display_title.clone();
            s.album = Some(subtitle.to_string());
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "bookend"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    fn send(&self, cmd: ControlCmd) {
        let _ = self.tx.send(cmd);
    }
}

/// Every transport capability is always on, so the `Can*` properties
/// share one answer.
#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.send(ControlCmd::Next);
    }

    fn previous(&self) {
        self.send(ControlCmd::Prev);
    }

    fn play(&self) {
        self.send(ControlCmd::Play);
    }

    fn pause(&self) {
        self.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        self.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        self.send(ControlCmd::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.state
            .lock()
            .map(|s| status_name(s.playback))
            .unwrap_or("Stopped")
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        self.state.lock().map(|s| s.metadata()).unwrap_or_default()
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }
}

/// Claim the bus name and export both interfaces.
async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
) -> zbus::Result<zbus::Connection> {
    connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, RootIface { tx: tx.clone() })?
        .serve_at(OBJECT_PATH, PlayerIface { tx, state })?
        .build()
        .await
}

/// Register the MPRIS service on the session bus from a background thread.
///
/// Failing to reach the bus is logged and otherwise ignored; the handle keeps
/// accepting updates either way.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let _connection = match serve(tx, state_for_thread).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "MPRIS service unavailable");
                    return;
                }
            };
            info!(name = BUS_NAME, "MPRIS service registered");
            loop {
                Timer::after(Duration::from_secs(3600)).await;
            }
        });
    });

    MprisHandle { state }
}
