use super::state::{AppState, MonitorHandle};
use crate::session::{new_session_id, SessionOutcome, SessionRecord};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartMonitorResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopMonitorResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub record: SessionRecord,
    pub outcome: SessionOutcome,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /monitor/start
/// Start a new monitoring session
pub async fn start_monitor(State(state): State<AppState>) -> impl IntoResponse {
    let mut monitor = state.monitor.write().await;

    if let Some(handle) = monitor.as_ref() {
        if handle.is_running() {
            return error_response(
                StatusCode::CONFLICT,
                format!("Session {} is already running", handle.session_id),
            );
        }
    }

    let session_id = new_session_id();
    info!("Starting monitoring session: {}", session_id);

    let cancel = CancellationToken::new();
    let session = match state.launcher.launch(session_id.clone(), cancel.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create session: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create session: {:#}", e),
            );
        }
    };

    let status = session.subscribe();
    let task = tokio::spawn(session.run());

    *monitor = Some(MonitorHandle {
        session_id: session_id.clone(),
        cancel,
        status,
        task,
    });

    (
        StatusCode::OK,
        Json(StartMonitorResponse {
            session_id: session_id.clone(),
            status: "running".to_string(),
            message: format!("Monitoring started for session {}", session_id),
        }),
    )
        .into_response()
}

/// POST /monitor/stop
/// Stop the current session (external signal) and return its final record
///
/// The slot stays locked until the session has drained, so a concurrent
/// start cannot overlap it.
pub async fn stop_monitor(State(state): State<AppState>) -> impl IntoResponse {
    let mut monitor = state.monitor.write().await;

    let Some(handle) = monitor.take() else {
        return error_response(StatusCode::NOT_FOUND, "No monitoring session".to_string());
    };

    info!("Stopping monitoring session: {}", handle.session_id);
    handle.cancel.cancel();

    let joined = handle.task.await;
    drop(monitor);

    match joined {
        Ok(report) => {
            let status = match report.outcome {
                SessionOutcome::Completed { .. } => "stopped",
                SessionOutcome::Cancelled => "cancelled",
            };
            (
                StatusCode::OK,
                Json(StopMonitorResponse {
                    session_id: handle.session_id.clone(),
                    status: status.to_string(),
                    message: format!("Session {} {}", handle.session_id, status),
                    record: report.record,
                    outcome: report.outcome,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Session task panicked: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session task failed: {}", e),
            )
        }
    }
}

/// GET /monitor/status
/// Latest snapshot of the current (or most recent) session
pub async fn monitor_status(State(state): State<AppState>) -> impl IntoResponse {
    let monitor = state.monitor.read().await;

    match monitor.as_ref() {
        Some(handle) => {
            let snapshot = handle.status.borrow().clone();
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No monitoring session".to_string()),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
