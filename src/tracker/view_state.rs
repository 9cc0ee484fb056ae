//! Observable now-playing state.
//!
//! Every setter compares the new value against the old one and only notifies
//! observers when it actually changed. Strings compare case-insensitively,
//! durations at millisecond granularity.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Names the property that changed in a notification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    IsPlaying,
    CurrentTitle,
    CurrentSubtitle,
    Elapsed,
    Duration,
    CurrentProgress,
    TotalProgress,
    BookCoverPath,
    IsBookOpen,
}

/// Equality as far as change notification is concerned.
trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

impl SameValue for bool {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl SameValue for Option<String> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
            // An unset string always takes the first assignment.
            _ => false,
        }
    }
}

impl SameValue for Duration {
    fn same_value(&self, other: &Self) -> bool {
        self.as_millis() == other.as_millis()
    }
}

impl SameValue for Option<PathBuf> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

fn assign<T: SameValue>(slot: &mut T, value: T) -> bool {
    if slot.same_value(&value) {
        return false;
    }
    *slot = value;
    true
}

#[derive(Default)]
pub struct ViewState {
    is_playing: bool,
    current_title: Option<String>,
    current_subtitle: Option<String>,
    elapsed: Duration,
    duration: Duration,
    current_progress: f64,
    total_progress: f64,
    book_cover_path: Option<PathBuf>,
    is_book_open: bool,
    observers: Vec<Sender<ViewProperty>>,
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty, $prop:expr) => {
        pub fn $name(&mut self, value: $ty) {
            if assign(&mut self.$field, value) {
                self.notify($prop);
            }
        }
    };
}

impl ViewState {
    /// Register an observer; it receives one `ViewProperty` per change.
    pub fn subscribe(&mut self) -> Receiver<ViewProperty> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, prop: ViewProperty) {
        self.observers.retain(|tx| tx.send(prop).is_ok());
    }

    setter!(set_is_playing, is_playing, bool, ViewProperty::IsPlaying);
    setter!(set_elapsed, elapsed, Duration, ViewProperty::Elapsed);
    setter!(set_duration, duration, Duration, ViewProperty::Duration);
    setter!(set_current_progress, current_progress, f64, ViewProperty::CurrentProgress);
    setter!(set_total_progress, total_progress, f64, ViewProperty::TotalProgress);
    setter!(set_is_book_open, is_book_open, bool, ViewProperty::IsBookOpen);

    pub fn set_current_title(&mut self, value: &str) {
        if assign(&mut self.current_title, Some(value.to_string())) {
            self.notify(ViewProperty::CurrentTitle);
        }
    }

    pub fn set_current_subtitle(&mut self, value: &str) {
        if assign(&mut self.current_subtitle, Some(value.to_string())) {
            self.notify(ViewProperty::CurrentSubtitle);
        }
    }

    pub fn set_book_cover_path(&mut self, value: Option<PathBuf>) {
        if assign(&mut self.book_cover_path, value) {
            self.notify(ViewProperty::BookCoverPath);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_title(&self) -> &str {
        self.current_title.as_deref().unwrap_or_default()
    }

    pub fn current_subtitle(&self) -> &str {
        self.current_subtitle.as_deref().unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn current_progress(&self) -> f64 {
        self.current_progress
    }

    pub fn total_progress(&self) -> f64 {
        self.total_progress
    }

    pub fn book_cover_path(&self) -> Option<&Path> {
        self.book_cover_path.as_deref()
    }

    pub fn is_book_open(&self) -> bool {
        self.is_book_open
    }
}
