use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// A single scheduled capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    /// Clip index within the session (0-based)
    pub index: u32,
    /// Clip name without extension, e.g. `audio3`
    pub name: String,
    /// Fixed capture length
    pub duration: Duration,
}

impl ClipRequest {
    pub fn new(index: u32, duration: Duration) -> Self {
        Self {
            index,
            name: format!("audio{}", index),
            duration,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.wav", self.name)
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to prepare clip directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exited {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to write clip {path:?}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("capture {name} still running after {limit:?}, abandoned")]
    TimedOut { name: String, limit: Duration },

    #[error("capture task failed: {0}")]
    Task(String),
}

/// Audio capture capability
///
/// Captures one clip of `duration` into the recorder's clip directory and
/// returns the written file path. The directory is created on first use.
#[async_trait::async_trait]
pub trait AudioRecorder: Send + Sync {
    async fn capture_clip(&self, name: &str, duration: Duration) -> Result<PathBuf, CaptureError>;

    /// Get recorder name for logging
    fn name(&self) -> &str;
}

/// Recorder selection in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderKind {
    /// ALSA `arecord` against the provisioned headset microphone
    Arecord,
    /// Silent WAV files of the right length (bench runs without a mic)
    Silent,
}

pub(crate) async fn ensure_clip_dir(dir: &Path) -> Result<(), CaptureError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| CaptureError::Directory {
            path: dir.to_path_buf(),
            source,
        })
}
