use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::messages::{CollectorAck, CollectorResponse, HardwareInput};
use crate::config::TelemetryConfig;
use crate::session::{SessionRecord, SessionStatus};

pub const HARDWARE_INPUT_PATH: &str = "/api/shower/hardware-input";

/// Longest slice of a non-JSON error body kept in a rejection reason
const MAX_REASON_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connection,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Other => "other",
        };
        f.write_str(kind)
    }
}

/// Why a record was not sent at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("session has not stopped")]
    NotStopped,
    #[error("session recorded no elapsed time")]
    NoElapsedTime,
    #[error("no valid temperature reading during the session")]
    NoTemperature,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{kind} error talking to collector: {source}")]
    Transport {
        kind: TransportErrorKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("collector rejected report ({status:?}): {reason}")]
    Rejected { status: Option<u16>, reason: String },
}

/// Result of handing a finished session to the collector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered(CollectorAck),
    Rejected {
        status: Option<u16>,
        reason: String,
    },
    TransportFailure {
        kind: TransportErrorKind,
        detail: String,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

impl From<TelemetryError> for DeliveryOutcome {
    fn from(err: TelemetryError) -> Self {
        match err {
            TelemetryError::Transport { kind, source } => DeliveryOutcome::TransportFailure {
                kind,
                detail: source.to_string(),
            },
            TelemetryError::Rejected { status, reason } => {
                DeliveryOutcome::Rejected { status, reason }
            }
        }
    }
}

/// Destination for finished sessions
#[async_trait::async_trait]
pub trait SessionSink: Send + Sync {
    /// Never fails; every problem is folded into the outcome
    async fn deliver(&self, record: &SessionRecord) -> DeliveryOutcome;
}

/// Posts finished sessions to the rewards collector
///
/// One attempt per session with a bounded timeout. Failures are logged
/// and returned, never retried or queued.
pub struct TelemetryReporter {
    client: reqwest::Client,
    endpoint: String,
    wallet_address: String,
}

impl TelemetryReporter {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        Self::with_timeout(&config.collector_url, &config.wallet_address, config.timeout())
    }

    pub fn with_timeout(collector_url: &str, wallet_address: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let endpoint = format!(
            "{}{}",
            collector_url.trim_end_matches('/'),
            HARDWARE_INPUT_PATH
        );

        info!("Telemetry reporter targeting {} (timeout {:?})", endpoint, timeout);

        Ok(Self {
            client,
            endpoint,
            wallet_address: wallet_address.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Guard, send, classify, and log
    pub async fn report(&self, record: &SessionRecord) -> DeliveryOutcome {
        let input = match self.prepare(record) {
            Ok(input) => input,
            Err(reason) => {
                warn!("Not reporting session {}: {}", record.session_id, reason);
                return DeliveryOutcome::Skipped { reason };
            }
        };

        info!(
            "Reporting session {}: {}s at {:.2}°C",
            record.session_id, input.actual_time, input.actual_temp
        );

        let outcome = match self.send(&input).await {
            Ok(ack) => DeliveryOutcome::Delivered(ack),
            Err(e) => DeliveryOutcome::from(e),
        };

        log_outcome(&record.session_id, &outcome);

        outcome
    }

    fn prepare(&self, record: &SessionRecord) -> Result<HardwareInput, SkipReason> {
        if record.status != SessionStatus::Stopped {
            return Err(SkipReason::NotStopped);
        }
        if record.elapsed_seconds() == 0 {
            return Err(SkipReason::NoElapsedTime);
        }

        HardwareInput::from_record(record, &self.wallet_address).ok_or(SkipReason::NoTemperature)
    }

    async fn send(&self, input: &HardwareInput) -> Result<CollectorAck, TelemetryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(input)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        let parsed = serde_json::from_str::<CollectorResponse>(&body);

        if status != StatusCode::OK {
            let reason = match parsed {
                Ok(CollectorResponse {
                    error: Some(error), ..
                }) => error,
                _ => truncate(&body),
            };
            return Err(TelemetryError::Rejected {
                status: Some(status.as_u16()),
                reason,
            });
        }

        match parsed {
            Ok(CollectorResponse {
                success: true,
                data: Some(ack),
                ..
            }) => Ok(ack),
            Ok(CollectorResponse { error, .. }) => Err(TelemetryError::Rejected {
                status: Some(status.as_u16()),
                reason: error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            Err(e) => Err(TelemetryError::Rejected {
                status: Some(status.as_u16()),
                reason: format!("malformed collector response: {}", e),
            }),
        }
    }
}

#[async_trait::async_trait]
impl SessionSink for TelemetryReporter {
    async fn deliver(&self, record: &SessionRecord) -> DeliveryOutcome {
        self.report(record).await
    }
}

fn transport_error(source: reqwest::Error) -> TelemetryError {
    let kind = if source.is_timeout() {
        TransportErrorKind::Timeout
    } else if source.is_connect() {
        TransportErrorKind::Connection
    } else {
        TransportErrorKind::Other
    };

    TelemetryError::Transport { kind, source }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_REASON_LEN).collect()
}

fn log_outcome(session_id: &str, outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Delivered(ack) => {
            info!(
                "Session {} delivered: {} points, {} CleanEnv, {} SoapToken (chain: {})",
                session_id,
                ack.points,
                ack.clean_env_coins,
                ack.soap_token_coins,
                ack.blockchain_sync.status
            );
            if let Some(e) = &ack.blockchain_sync.error {
                warn!("Collector reported blockchain sync error: {}", e);
            }
            info!(
                "Lifetime: {} points over {} showers",
                ack.lifetime_total.points, ack.lifetime_total.showers
            );
        }
        DeliveryOutcome::Rejected { status, reason } => {
            error!("Collector rejected session {} ({:?}): {}", session_id, status, reason);
        }
        DeliveryOutcome::TransportFailure { kind, detail } => {
            error!("Could not reach collector for session {} ({}): {}", session_id, kind, detail);
        }
        DeliveryOutcome::Skipped { reason } => {
            warn!("Session {} not reported: {}", session_id, reason);
        }
    }
}
