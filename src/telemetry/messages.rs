use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;

/// Body of `POST /api/shower/hardware-input`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareInput {
    pub wallet_address: String,
    /// Session length in whole seconds
    pub actual_time: u64,
    /// Peak temperature in °C, rounded to 2 decimals
    pub actual_temp: f64,
}

impl HardwareInput {
    /// `None` when the record never saw a valid temperature
    pub fn from_record(record: &SessionRecord, wallet_address: &str) -> Option<Self> {
        let peak = record.peak_temperature()?;

        Some(Self {
            wallet_address: wallet_address.to_string(),
            actual_time: record.elapsed_seconds(),
            actual_temp: (peak * 100.0).round() / 100.0,
        })
    }
}

/// Envelope returned by the collector
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<CollectorAck>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Rewards credited for the reported session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorAck {
    pub points: f64,
    pub clean_env_coins: f64,
    pub soap_token_coins: f64,
    #[serde(default)]
    pub blockchain_sync: BlockchainSync,
    #[serde(default)]
    pub lifetime_total: LifetimeTotal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainSync {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soap_token_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_env_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeTotal {
    pub points: f64,
    pub showers: u64,
    pub clean_env_coins: f64,
    pub soap_token_coins: f64,
}
