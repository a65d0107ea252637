use serde::{Deserialize, Serialize};

use crate::sensors::SensorSample;

/// One signal's opinion about the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Present,
    Absent,
    /// No usable evidence this tick
    Abstain,
}

/// A named source of presence evidence
pub trait PresenceSignal: Send {
    fn name(&self) -> &'static str;

    fn vote(&mut self, sample: &SensorSample) -> Vote;
}

/// How a distance reading is compared against the "no target" sentinel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DistanceMatch {
    /// Reading rounded to 2 decimals equals the sentinel
    #[default]
    Exact,
    /// Reading within `cm` of the sentinel
    Tolerance { cm: f64 },
    /// Reading at or beyond the sentinel
    AtLeast,
}

/// Ultrasonic ranger signal
///
/// The ranger reports its maximum range when nothing is in front of it,
/// so a reading matching that sentinel means the stall is empty.
#[derive(Debug, Clone)]
pub struct DistanceSignal {
    sentinel_cm: f64,
    matching: DistanceMatch,
}

impl DistanceSignal {
    pub fn new(sentinel_cm: f64, matching: DistanceMatch) -> Self {
        Self {
            sentinel_cm,
            matching,
        }
    }

    pub fn is_sentinel(&self, distance_cm: f64) -> bool {
        let rounded = round_cm(distance_cm);
        match self.matching {
            DistanceMatch::Exact => rounded == self.sentinel_cm,
            DistanceMatch::Tolerance { cm } => (rounded - self.sentinel_cm).abs() <= cm,
            DistanceMatch::AtLeast => rounded >= self.sentinel_cm,
        }
    }
}

impl PresenceSignal for DistanceSignal {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn vote(&mut self, sample: &SensorSample) -> Vote {
        match sample.distance_cm {
            Some(d) if self.is_sentinel(d) => Vote::Absent,
            Some(_) => Vote::Present,
            None => Vote::Abstain,
        }
    }
}

/// Placeholder for clip-based detection; never votes
#[derive(Debug, Clone, Default)]
pub struct AudioSignal;

impl PresenceSignal for AudioSignal {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn vote(&mut self, _sample: &SensorSample) -> Vote {
        Vote::Abstain
    }
}

/// Placeholder for humidity-decay detection; never votes
#[derive(Debug, Clone, Default)]
pub struct HumiditySignal;

impl PresenceSignal for HumiditySignal {
    fn name(&self) -> &'static str {
        "humidity"
    }

    fn vote(&mut self, _sample: &SensorSample) -> Vote {
        Vote::Abstain
    }
}

fn round_cm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
