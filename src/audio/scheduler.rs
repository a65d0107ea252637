use std::time::Duration;

use super::recorder::ClipRequest;

/// Fixed-cadence capture schedule on the session tick clock
///
/// Counts ticks, not captures: a failed or slow capture never shifts
/// the next request.
#[derive(Debug, Clone)]
pub struct AudioScheduler {
    capture_interval: u32,
    clip_duration: Duration,
    ticks_since_last_capture: u32,
    clip_index: u32,
}

impl AudioScheduler {
    /// An interval of zero disables capture.
    pub fn new(capture_interval: u32, clip_duration: Duration) -> Self {
        Self {
            capture_interval,
            clip_duration,
            ticks_since_last_capture: 0,
            clip_index: 0,
        }
    }

    /// Advance one tick; returns a request when the interval is reached
    pub fn tick(&mut self) -> Option<ClipRequest> {
        if self.capture_interval == 0 {
            return None;
        }

        self.ticks_since_last_capture += 1;
        if self.ticks_since_last_capture < self.capture_interval {
            return None;
        }

        self.ticks_since_last_capture = 0;
        let request = ClipRequest::new(self.clip_index, self.clip_duration);
        self.clip_index += 1;

        Some(request)
    }

    pub fn ticks_since_last_capture(&self) -> u32 {
        self.ticks_since_last_capture
    }

    /// Number of captures requested so far
    pub fn clip_index(&self) -> u32 {
        self.clip_index
    }
}
