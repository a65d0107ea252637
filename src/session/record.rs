use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sensors::SensorSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Running,
    Stopped,
}

/// Aggregated statistics for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: String,

    pub started_at: DateTime<Utc>,

    /// Set when the record is frozen
    pub ended_at: Option<DateTime<Utc>>,

    /// Ticks executed so far
    pub ticks: u64,

    /// Tick count times tick period; never wall-clock time
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,

    /// Highest valid temperature seen, `-inf` until the first one
    #[serde(serialize_with = "serialize_peak")]
    pub max_temperature_c: f64,

    pub status: SessionStatus,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            ticks: 0,
            elapsed: Duration::ZERO,
            max_temperature_c: f64::NEG_INFINITY,
            status: SessionStatus::Running,
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }

    /// `None` until a valid temperature has been folded in
    pub fn peak_temperature(&self) -> Option<f64> {
        self.max_temperature_c
            .is_finite()
            .then_some(self.max_temperature_c)
    }

    /// Final copy handed to telemetry
    pub fn freeze(mut self) -> Self {
        self.status = SessionStatus::Stopped;
        self.ended_at = Some(Utc::now());
        self
    }
}

fn serialize_seconds<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

fn serialize_peak<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

/// Where the session loop is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    WaitingForStart,
    Running,
    Stopped,
    Cancelled,
}

/// Read-only view published after every tick
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: LoopState,
    pub ticks: u64,
    pub elapsed_seconds: u64,
    pub max_temperature_c: Option<f64>,
    pub consecutive_absent_ticks: u32,
    pub clips_requested: u32,
    pub last_sample: Option<SensorSample>,
}
