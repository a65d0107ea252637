//! Sensor access for the session loop
//!
//! The physical drivers live outside this crate; the loop only talks to
//! the [`SensorPort`] trait. [`ReplaySensors`] drives sessions from a JSON
//! script for bench runs and tests.

pub mod port;
pub mod replay;

pub use port::{SensorField, SensorPort, SensorReadError, SensorSample};
pub use replay::{ReplaySensors, ScriptedReading};
