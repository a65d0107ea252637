//! HTTP API for starting and stopping monitoring
//!
//! - POST /monitor/start - Start a new session
//! - POST /monitor/stop - Stop the current session (not reported)
//! - GET /monitor/status - Latest session snapshot
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, MonitorHandle};
