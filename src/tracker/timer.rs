use std::time::{Duration, Instant};

/// Fixed-cadence progress timer, polled by the event loop.
///
/// There is only ever one deadline, so a tick can never overlap another.
#[derive(Debug)]
pub struct ProgressTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl ProgressTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// True once per elapsed interval; the next deadline is re-armed from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}
