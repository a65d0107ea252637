use tracing::{debug, info};

use super::signal::{AudioSignal, DistanceMatch, DistanceSignal, HumiditySignal, PresenceSignal, Vote};
use crate::sensors::SensorSample;

/// Per-tick classification after combining every signal's vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    /// No signal could vote; the absent run is left as is
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    /// The absent run reached the threshold
    Ended { absent_ticks: u32 },
}

/// Turns noisy per-tick presence into a single end-of-session event
///
/// Any absent vote makes the tick absent. Absent ticks extend the run,
/// present ticks reset it, and the tick on which the run first equals
/// `threshold` yields `Ended`. Nothing is emitted after that.
pub struct PresenceDebouncer {
    signals: Vec<Box<dyn PresenceSignal>>,
    threshold: u32,
    consecutive_absent_ticks: u32,
    ended: bool,
}

impl PresenceDebouncer {
    pub fn new(signals: Vec<Box<dyn PresenceSignal>>, threshold: u32) -> Self {
        Self {
            signals,
            threshold,
            consecutive_absent_ticks: 0,
            ended: false,
        }
    }

    /// Distance-driven debouncer with the stub audio and humidity signals
    /// registered alongside
    pub fn with_distance(sentinel_cm: f64, matching: DistanceMatch, threshold: u32) -> Self {
        let signals: Vec<Box<dyn PresenceSignal>> = vec![
            Box::new(DistanceSignal::new(sentinel_cm, matching)),
            Box::new(AudioSignal),
            Box::new(HumiditySignal),
        ];

        Self::new(signals, threshold)
    }

    pub fn signal_names(&self) -> Vec<&'static str> {
        self.signals.iter().map(|s| s.name()).collect()
    }

    pub fn consecutive_absent_ticks(&self) -> u32 {
        self.consecutive_absent_ticks
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn classify(&mut self, sample: &SensorSample) -> Presence {
        let mut presence = Presence::Indeterminate;

        for signal in &mut self.signals {
            match signal.vote(sample) {
                Vote::Absent => {
                    debug!("Signal {} votes absent", signal.name());
                    presence = Presence::Absent;
                }
                Vote::Present if presence == Presence::Indeterminate => {
                    presence = Presence::Present;
                }
                Vote::Present | Vote::Abstain => {}
            }
        }

        presence
    }

    /// Fold one tick into the absent run
    pub fn observe(&mut self, sample: &SensorSample) -> Option<PresenceEvent> {
        if self.ended {
            return None;
        }

        match self.classify(sample) {
            Presence::Absent => self.consecutive_absent_ticks += 1,
            Presence::Present => {
                if self.consecutive_absent_ticks > 0 {
                    debug!(
                        "Presence regained after {} absent ticks",
                        self.consecutive_absent_ticks
                    );
                }
                self.consecutive_absent_ticks = 0;
            }
            Presence::Indeterminate => {}
        }

        if self.consecutive_absent_ticks == self.threshold {
            self.ended = true;
            info!(
                "No presence for {} consecutive ticks, session ended",
                self.consecutive_absent_ticks
            );
            return Some(PresenceEvent::Ended {
                absent_ticks: self.consecutive_absent_ticks,
            });
        }

        None
    }
}
