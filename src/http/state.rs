use crate::session::{SessionLauncher, SessionReport, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A session started through the API
pub struct MonitorHandle {
    pub session_id: String,
    pub cancel: CancellationToken,
    pub status: watch::Receiver<SessionSnapshot>,
    pub task: JoinHandle<SessionReport>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Builds a session loop per start request
    pub launcher: Arc<dyn SessionLauncher>,

    /// The current (or most recent) session
    pub monitor: Arc<RwLock<Option<MonitorHandle>>>,
}

impl AppState {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            launcher,
            monitor: Arc::new(RwLock::new(None)),
        }
    }
}
