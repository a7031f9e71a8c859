//! Blocking waits, injectable so tests never sleep.

use std::sync::{Arc, Mutex};
use std::time::Duration;

pub trait Pause: Send + Sync {
    fn pause(&self, duration: Duration);
}

impl<P> Pause for Arc<P>
where
    P: Pause + ?Sized,
{
    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested waits without sleeping.
#[derive(Debug, Default)]
pub struct RecordingPause {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.waits().into_iter().sum()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}
