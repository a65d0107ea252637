// Replays a recorded or hand-written script of sensor readings
//
// Script format is a JSON array, one entry per tick:
//
//   [
//     { "distance_cm": 42.5, "temperature_c": 31.2, "humidity_pct": 70.1 },
//     { "distance_cm": null, "temperature_c": 31.4, "humidity_pct": 70.3 }
//   ]
//
// A `null` (or missing) field is served as a read failure. Once the script
// runs out, the last entry repeats so a session can always settle.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::port::{SensorField, SensorPort, SensorReadError};

/// One scripted tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedReading {
    #[serde(default)]
    pub distance_cm: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
}

impl ScriptedReading {
    pub fn new(distance_cm: f64, temperature_c: f64, humidity_pct: f64) -> Self {
        Self {
            distance_cm: Some(distance_cm),
            temperature_c: Some(temperature_c),
            humidity_pct: Some(humidity_pct),
        }
    }
}

/// Sensor port backed by a script
///
/// Every field keeps its own cursor, so a tick that reads each field once
/// stays aligned with the script even when individual reads fail.
pub struct ReplaySensors {
    name: String,
    script: Vec<ScriptedReading>,
    distance_cursor: usize,
    temperature_cursor: usize,
    humidity_cursor: usize,
}

impl ReplaySensors {
    pub fn new(name: impl Into<String>, script: Vec<ScriptedReading>) -> Self {
        Self {
            name: name.into(),
            script,
            distance_cursor: 0,
            temperature_cursor: 0,
            humidity_cursor: 0,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening sensor script: {}", path.display());

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sensor script: {}", path.display()))?;

        let script: Vec<ScriptedReading> =
            serde_json::from_str(&raw).context("Failed to parse sensor script")?;

        if script.is_empty() {
            bail!("Sensor script {} has no readings", path.display());
        }

        info!("Sensor script loaded: {} ticks", script.len());

        Ok(Self::new(format!("replay:{}", path.display()), script))
    }

    /// Number of scripted ticks
    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    fn next(
        script: &[ScriptedReading],
        cursor: &mut usize,
        field: SensorField,
        pick: impl Fn(&ScriptedReading) -> Option<f64>,
    ) -> Result<f64, SensorReadError> {
        let entry = script
            .get(*cursor)
            .or_else(|| script.last())
            .ok_or(SensorReadError::NoData(field))?;

        *cursor += 1;

        pick(entry).ok_or_else(|| SensorReadError::Io {
            field,
            message: "scripted read failure".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl SensorPort for ReplaySensors {
    async fn read_distance_cm(&mut self) -> Result<f64, SensorReadError> {
        Self::next(
            &self.script,
            &mut self.distance_cursor,
            SensorField::Distance,
            |r| r.distance_cm,
        )
    }

    async fn read_temperature_c(&mut self) -> Result<f64, SensorReadError> {
        Self::next(
            &self.script,
            &mut self.temperature_cursor,
            SensorField::Temperature,
            |r| r.temperature_c,
        )
    }

    async fn read_humidity_pct(&mut self) -> Result<f64, SensorReadError> {
        Self::next(
            &self.script,
            &mut self.humidity_cursor,
            SensorField::Humidity,
            |r| r.humidity_pct,
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}
