pub mod audio;
pub mod config;
pub mod http;
pub mod presence;
pub mod sensors;
pub mod session;
pub mod telemetry;

pub use audio::{
    AudioRecorder, AudioScheduler, CaptureDispatch, CaptureError, ClipDispatcher, ClipRequest,
    DispatchStats, RecorderKind,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use presence::{DistanceMatch, PresenceDebouncer, PresenceEvent};
pub use sensors::{ReplaySensors, ScriptedReading, SensorPort, SensorReadError, SensorSample};
pub use session::{
    ConfiguredLauncher, MonitorConfig, SessionLauncher, SessionLoop, SessionOutcome,
    SessionRecord, SessionReport, SessionStatus,
};
pub use telemetry::{DeliveryOutcome, SessionSink, TelemetryReporter, TransportErrorKind};
