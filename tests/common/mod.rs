// Shared fakes for integration tests

#![allow(dead_code)]

use shower_sense::audio::{AudioRecorder, CaptureError};
use shower_sense::telemetry::{BlockchainSync, CollectorAck, LifetimeTotal};
use shower_sense::{DeliveryOutcome, ScriptedReading, SessionRecord, SessionSink};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const SENTINEL: f64 = 100.0;

/// Someone standing in front of the ranger
pub fn present(temperature_c: f64) -> ScriptedReading {
    ScriptedReading::new(42.0, temperature_c, 65.0)
}

/// Empty stall; temperature read fails
pub fn absent() -> ScriptedReading {
    ScriptedReading {
        distance_cm: Some(SENTINEL),
        temperature_c: None,
        humidity_pct: Some(70.0),
    }
}

pub fn sample_ack() -> CollectorAck {
    CollectorAck {
        points: 120.0,
        clean_env_coins: 3.0,
        soap_token_coins: 1.5,
        blockchain_sync: BlockchainSync {
            status: "synced".to_string(),
            ..BlockchainSync::default()
        },
        lifetime_total: LifetimeTotal {
            points: 900.0,
            showers: 12,
            clean_env_coins: 40.0,
            soap_token_coins: 10.0,
        },
    }
}

/// Remembers every record it is handed and answers with a fixed outcome
pub struct FakeSink {
    pub delivered: Mutex<Vec<SessionRecord>>,
    outcome: DeliveryOutcome,
}

impl FakeSink {
    pub fn new(outcome: DeliveryOutcome) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            outcome,
        }
    }

    pub fn accepting() -> Self {
        Self::new(DeliveryOutcome::Delivered(sample_ack()))
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SessionSink for FakeSink {
    async fn deliver(&self, record: &SessionRecord) -> DeliveryOutcome {
        self.delivered.lock().unwrap().push(record.clone());
        self.outcome.clone()
    }
}

/// Records when each capture started; takes the full clip duration
pub struct ClockedRecorder {
    pub calls: Mutex<Vec<(String, Instant)>>,
    fail_first: usize,
}

impl ClockedRecorder {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    /// The first `n` captures fail
    pub fn failing_first(n: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_first: n,
        }
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AudioRecorder for ClockedRecorder {
    async fn capture_clip(&self, name: &str, duration: Duration) -> Result<PathBuf, CaptureError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((name.to_string(), Instant::now()));
            calls.len()
        };

        tokio::time::sleep(duration).await;

        if attempt <= self.fail_first {
            return Err(CaptureError::Task("microphone unavailable".to_string()));
        }

        Ok(PathBuf::from(format!("{}.wav", name)))
    }

    fn name(&self) -> &str {
        "clocked"
    }
}

/// A capture that never returns, like `arecord` on an unrouted headset
pub struct StuckRecorder;

#[async_trait::async_trait]
impl AudioRecorder for StuckRecorder {
    async fn capture_clip(&self, _name: &str, _duration: Duration) -> Result<PathBuf, CaptureError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stuck"
    }
}
