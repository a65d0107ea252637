use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::RecorderKind;
use crate::session::MonitorConfig;

/// Environment variables with this prefix override file values,
/// e.g. `SHOWER_SENSE__TELEMETRY__WALLET_ADDRESS`.
const ENV_PREFIX: &str = "SHOWER_SENSE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Which recorder backs the capture schedule
    pub recorder: RecorderKind,
    /// Directory for `audio<N>.wav` clips (`~` is expanded)
    pub clips_dir: String,
    /// Bluetooth card to switch into headset mode before the first tick,
    /// e.g. `bluez_card.2C_76_00_CF_F2_1C`
    pub headset_card: Option<String>,
}

impl AudioConfig {
    pub fn clips_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.clips_dir).into_owned())
    }

    /// Headset card to bring up at startup; only the live microphone needs it
    pub fn provisioning_card(&self) -> Option<&str> {
        match self.recorder {
            RecorderKind::Arecord => self.headset_card.as_deref(),
            RecorderKind::Silent => None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            recorder: RecorderKind::Arecord,
            clips_dir: "~/.shower-sense/clips".to_string(),
            headset_card: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// JSON script of readings to replay instead of live hardware
    pub script: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Base URL of the collector, e.g. `http://localhost:3001`
    #[serde(default = "default_collector_url")]
    pub collector_url: String,
    pub wallet_address: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_collector_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        cfg.monitor.validate()?;

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CaptureDispatch;
    use crate::presence::DistanceMatch;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_uses_reference_defaults() {
        let cfg = parse(
            r#"
            [service]
            name = "shower-sense"
            http = { bind = "127.0.0.1", port = 8000 }

            [telemetry]
            wallet_address = "wallet-1"
            "#,
        );

        assert_eq!(cfg.monitor.absent_threshold, 25);
        assert_eq!(cfg.monitor.capture_interval_ticks, 30);
        assert_eq!(cfg.monitor.distance_match, DistanceMatch::Exact);
        assert_eq!(cfg.monitor.capture_dispatch, CaptureDispatch::Background);
        assert_eq!(cfg.telemetry.collector_url, "http://localhost:3001");
        assert_eq!(cfg.telemetry.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.audio.recorder, RecorderKind::Arecord);
        assert!(cfg.sensors.script.is_none());
    }

    #[test]
    fn test_distance_match_modes_parse() {
        let cfg = parse(
            r#"
            [service]
            name = "shower-sense"
            http = { bind = "127.0.0.1", port = 8000 }

            [monitor]
            distance_match = { mode = "tolerance", cm = 0.5 }
            capture_dispatch = "inline"

            [audio]
            recorder = "silent"
            clips_dir = "/tmp/clips"

            [telemetry]
            wallet_address = "wallet-1"
            timeout_secs = 5
            "#,
        );

        assert_eq!(cfg.monitor.distance_match, DistanceMatch::Tolerance { cm: 0.5 });
        assert_eq!(cfg.monitor.capture_dispatch, CaptureDispatch::Inline);
        assert_eq!(cfg.audio.recorder, RecorderKind::Silent);
        assert_eq!(cfg.audio.clips_dir(), PathBuf::from("/tmp/clips"));
        assert_eq!(cfg.telemetry.timeout_secs, 5);
    }

    #[test]
    fn test_headset_provisioned_only_for_live_recorder() {
        let mut audio = AudioConfig {
            headset_card: Some("bluez_card.2C_76_00_CF_F2_1C".to_string()),
            ..AudioConfig::default()
        };
        assert_eq!(audio.provisioning_card(), Some("bluez_card.2C_76_00_CF_F2_1C"));

        audio.recorder = RecorderKind::Silent;
        assert_eq!(audio.provisioning_card(), None);

        assert_eq!(AudioConfig::default().provisioning_card(), None);
    }
}
