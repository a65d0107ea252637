use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::CaptureDispatch;
use crate::presence::DistanceMatch;

/// Tuning for one monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling period in milliseconds
    /// Default: 1000 (one tick per second)
    pub tick_period_ms: u64,

    /// Consecutive absent ticks that end the session
    pub absent_threshold: u32,

    /// Ranger reading that means "no target" (its max range)
    pub sentinel_distance_cm: f64,

    /// How readings are compared against the sentinel
    pub distance_match: DistanceMatch,

    /// Ticks between audio captures (0 disables capture)
    pub capture_interval_ticks: u32,

    /// Length of each audio clip in seconds
    pub clip_duration_secs: u64,

    pub capture_dispatch: CaptureDispatch,
}

impl MonitorConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn clip_duration(&self) -> Duration {
        Duration::from_secs(self.clip_duration_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            bail!("monitor.tick_period_ms must be greater than zero");
        }
        // Reported time is whole seconds, so every tick must add whole seconds
        if self.tick_period_ms % 1000 != 0 {
            bail!(
                "monitor.tick_period_ms must be a whole number of seconds, got {}ms",
                self.tick_period_ms
            );
        }
        if self.absent_threshold == 0 {
            bail!("monitor.absent_threshold must be at least 1");
        }
        if !self.sentinel_distance_cm.is_finite() {
            bail!("monitor.sentinel_distance_cm must be a finite number");
        }
        if let DistanceMatch::Tolerance { cm } = self.distance_match {
            if !(cm.is_finite() && cm >= 0.0) {
                bail!("monitor.distance_match tolerance must be a non-negative number");
            }
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1000,
            absent_threshold: 25,
            sentinel_distance_cm: 100.0,
            distance_match: DistanceMatch::Exact,
            capture_interval_ticks: 30,
            clip_duration_secs: 5,
            capture_dispatch: CaptureDispatch::Background,
        }
    }
}
