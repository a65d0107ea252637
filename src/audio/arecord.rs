// ALSA capture through the `arecord` CLI
//
// The shower unit records from a Bluetooth headset routed over SCO, so
// the headset has to be switched into head-unit mode once at boot
// (see `provision_headset`) before any clip can be captured.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use super::recorder::{ensure_clip_dir, AudioRecorder, CaptureError};

const ARECORD: &str = "arecord";

/// Records 16-bit mono clips with `arecord`
pub struct ArecordRecorder {
    clips_dir: PathBuf,
    sample_rate: u32,
}

impl ArecordRecorder {
    pub fn new(clips_dir: PathBuf) -> Self {
        Self {
            clips_dir,
            sample_rate: 16000,
        }
    }

    pub fn clips_dir(&self) -> &PathBuf {
        &self.clips_dir
    }
}

#[async_trait::async_trait]
impl AudioRecorder for ArecordRecorder {
    async fn capture_clip(&self, name: &str, duration: Duration) -> Result<PathBuf, CaptureError> {
        ensure_clip_dir(&self.clips_dir).await?;

        let output = self.clips_dir.join(format!("{}.wav", name));
        // arecord only takes whole seconds
        let secs = duration.as_secs().max(1);

        info!("Recording {}s to {}", secs, output.display());

        let result = Command::new(ARECORD)
            .arg("-d")
            .arg(secs.to_string())
            .args(["-f", "S16_LE", "-r"])
            .arg(self.sample_rate.to_string())
            .args(["-c", "1"])
            .arg(&output)
            .output()
            .await
            .map_err(|source| CaptureError::Spawn {
                program: ARECORD.to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(CaptureError::Exited {
                program: ARECORD.to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "arecord"
    }
}

/// One-time Bluetooth bring-up for the headset microphone
///
/// Switches the card profile to `headset-head-unit`, then opens the Pi 4
/// SCO routing gate through the vendor HCI command.
pub async fn provision_headset(card: &str) -> Result<()> {
    info!("Provisioning headset {}", card);

    run_setup_step(
        "pactl",
        &["set-card-profile", card, "headset-head-unit"],
    )
    .await?;

    run_setup_step(
        "sudo",
        &[
            "hcitool", "cmd", "0x3F", "0x01C", "0x01", "0x02", "0x00", "0x01", "0x01",
        ],
    )
    .await?;

    info!("Headset {} ready", card);

    Ok(())
}

async fn run_setup_step(program: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to execute {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} {:?} failed: {}", program, args, stderr.trim());
        bail!("{} exited with {}", program, output.status);
    }

    Ok(())
}
