//! Shower session management
//!
//! This module provides the `SessionLoop` that runs one monitored session:
//! - Fixed-period sensor sampling
//! - Peak temperature and duration aggregation
//! - Periodic audio capture
//! - Debounced end-of-session detection
//! - Hand-off of the finished record to telemetry

mod aggregator;
mod config;
mod launcher;
mod monitor;
mod record;

pub use aggregator::SessionAggregator;
pub use config::MonitorConfig;
pub use launcher::{new_session_id, prepare_audio, ConfiguredLauncher, SessionLauncher};
pub use monitor::{SessionLoop, SessionOutcome, SessionReport};
pub use record::{LoopState, SessionRecord, SessionSnapshot, SessionStatus};
