use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::config::MonitorConfig;
use super::monitor::SessionLoop;
use crate::audio::{create_recorder, provision_headset, AudioRecorder};
use crate::config::{AudioConfig, Config};
use crate::sensors::{ReplaySensors, SensorPort};
use crate::telemetry::{SessionSink, TelemetryReporter};

/// Builds ready-to-run session loops on demand
pub trait SessionLauncher: Send + Sync {
    fn launch(&self, session_id: String, cancel: CancellationToken) -> Result<SessionLoop>;
}

/// Generate a fresh session identifier
pub fn new_session_id() -> String {
    format!("shower-{}", uuid::Uuid::new_v4())
}

/// Launcher wired from the service configuration
pub struct ConfiguredLauncher {
    monitor: MonitorConfig,
    script: Option<PathBuf>,
    recorder: Arc<dyn AudioRecorder>,
    sink: Arc<dyn SessionSink>,
}

impl ConfiguredLauncher {
    pub fn new(config: &Config) -> Result<Self> {
        let reporter = TelemetryReporter::new(&config.telemetry)
            .context("Failed to create telemetry reporter")?;

        Ok(Self {
            monitor: config.monitor.clone(),
            script: config.sensors.script.as_ref().map(PathBuf::from),
            recorder: create_recorder(config.audio.recorder, config.audio.clips_dir()),
            sink: Arc::new(reporter),
        })
    }

    /// Replay this script instead of the configured one
    pub fn with_script(mut self, script: PathBuf) -> Self {
        self.script = Some(script);
        self
    }

    fn open_sensors(&self) -> Result<Box<dyn SensorPort>> {
        match &self.script {
            Some(path) => Ok(Box::new(ReplaySensors::open(path)?)),
            None => bail!(
                "No sensor source configured: set sensors.script or pass --script \
                (hardware drivers attach through the SensorPort trait)"
            ),
        }
    }
}

impl SessionLauncher for ConfiguredLauncher {
    fn launch(&self, session_id: String, cancel: CancellationToken) -> Result<SessionLoop> {
        let sensors = self.open_sensors()?;

        let session = SessionLoop::new(
            session_id,
            self.monitor.clone(),
            sensors,
            Arc::clone(&self.recorder),
            Arc::clone(&self.sink),
        )?;

        Ok(session.with_cancellation(cancel))
    }
}

/// Run the one-time audio bring-up when the live recorder has a headset
///
/// Failure is logged; monitoring still works, captures will just fail.
pub async fn prepare_audio(audio: &AudioConfig) {
    match audio.provisioning_card() {
        Some(card) => {
            if let Err(e) = provision_headset(card).await {
                warn!("Headset provisioning failed, captures may fail: {:#}", e);
            }
        }
        None => info!(
            "No headset to provision for {:?} recorder, skipping audio bring-up",
            audio.recorder
        ),
    }
}
