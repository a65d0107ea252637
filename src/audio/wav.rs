use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::recorder::{ensure_clip_dir, AudioRecorder, CaptureError};

/// Writes silent clips of the requested length
///
/// Stands in for the microphone on bench rigs so the capture schedule,
/// clip naming, and directory handling behave exactly as on the device.
pub struct SilentClipRecorder {
    clips_dir: PathBuf,
    sample_rate: u32,
    channels: u16,
}

impl SilentClipRecorder {
    pub fn new(clips_dir: PathBuf) -> Self {
        Self {
            clips_dir,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

#[async_trait::async_trait]
impl AudioRecorder for SilentClipRecorder {
    async fn capture_clip(&self, name: &str, duration: Duration) -> Result<PathBuf, CaptureError> {
        ensure_clip_dir(&self.clips_dir).await?;

        let path = self.clips_dir.join(format!("{}.wav", name));
        let sample_count =
            (duration.as_secs_f64() * self.sample_rate as f64) as usize * self.channels as usize;
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let written = path.clone();
        tokio::task::spawn_blocking(move || {
            let mut writer = ClipWriter::create(&written, sample_rate, channels)?;
            writer.write_silence(sample_count)?;
            writer.finish()
        })
        .await
        .map_err(|e| CaptureError::Task(e.to_string()))??;

        info!("Wrote silent clip {} ({} samples)", path.display(), sample_count);

        Ok(path)
    }

    fn name(&self) -> &str {
        "silent"
    }
}

/// Writes a single clip to disk as WAV file
struct ClipWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
}

impl ClipWriter {
    fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec).map_err(|e| CaptureError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    fn write_silence(&mut self, samples: usize) -> Result<(), CaptureError> {
        if let Some(writer) = &mut self.writer {
            for _ in 0..samples {
                writer.write_sample(0i16).map_err(|e| CaptureError::Write {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Result<(), CaptureError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| CaptureError::Write {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl Drop for ClipWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
