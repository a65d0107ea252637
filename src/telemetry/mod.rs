//! Session report delivery to the rewards collector

pub mod messages;
pub mod reporter;

pub use messages::{BlockchainSync, CollectorAck, CollectorResponse, HardwareInput, LifetimeTotal};
pub use reporter::{
    DeliveryOutcome, SessionSink, SkipReason, TelemetryError, TelemetryReporter,
    TransportErrorKind, HARDWARE_INPUT_PATH,
};
