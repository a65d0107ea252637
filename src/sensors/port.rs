use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Which physical quantity a reading belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorField {
    Distance,
    Temperature,
    Humidity,
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorField::Distance => "distance",
            SensorField::Temperature => "temperature",
            SensorField::Humidity => "humidity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SensorReadError {
    #[error("{field} sensor I/O error: {message}")]
    Io { field: SensorField, message: String },

    #[error("{0} sensor returned no data")]
    NoData(SensorField),
}

impl SensorReadError {
    pub fn field(&self) -> SensorField {
        match self {
            SensorReadError::Io { field, .. } => *field,
            SensorReadError::NoData(field) => *field,
        }
    }
}

/// Sensor read interface
///
/// Implementations wrap the physical drivers (HC-SR04 ultrasonic ranger,
/// BME280 temperature/humidity stick). Each read is independently fallible;
/// the caller decides what a failure means for the current tick.
#[async_trait::async_trait]
pub trait SensorPort: Send {
    /// Distance to the nearest target in centimeters
    async fn read_distance_cm(&mut self) -> Result<f64, SensorReadError>;

    /// Ambient temperature in degrees Celsius
    async fn read_temperature_c(&mut self) -> Result<f64, SensorReadError>;

    /// Relative humidity in percent
    async fn read_humidity_pct(&mut self) -> Result<f64, SensorReadError>;

    /// Get sensor source name for logging
    fn name(&self) -> &str;
}

/// One tick's worth of readings. `None` marks a failed read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub distance_cm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl SensorSample {
    /// Read every field once, in order. Failures are logged and leave the
    /// field empty; they never abort the sample.
    pub async fn collect(port: &mut (dyn SensorPort + '_)) -> Self {
        let timestamp = Utc::now();

        let distance_cm = keep_reading(port.read_distance_cm().await);
        let temperature_c = keep_reading(port.read_temperature_c().await);
        let humidity_pct = keep_reading(port.read_humidity_pct().await);

        let sample = Self {
            distance_cm,
            temperature_c,
            humidity_pct,
            timestamp,
        };

        debug!(
            "Sample from {}: distance={:?}cm temp={:?}°C humidity={:?}%",
            port.name(),
            sample.distance_cm,
            sample.temperature_c,
            sample.humidity_pct
        );

        sample
    }
}

fn keep_reading(result: Result<f64, SensorReadError>) -> Option<f64> {
    match result {
        Ok(value) if value.is_finite() => Some(value),
        Ok(value) => {
            warn!("Discarding non-finite sensor reading: {}", value);
            None
        }
        Err(e) => {
            warn!("Skipping {} this tick: {}", e.field(), e);
            None
        }
    }
}
