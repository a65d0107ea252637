pub mod arecord;
pub mod dispatch;
pub mod recorder;
pub mod scheduler;
pub mod wav;

pub use arecord::{provision_headset, ArecordRecorder};
pub use dispatch::{CaptureDispatch, ClipDispatcher, DispatchStats};
pub use recorder::{AudioRecorder, CaptureError, ClipRequest, RecorderKind};
pub use scheduler::AudioScheduler;
pub use wav::SilentClipRecorder;

use std::path::PathBuf;
use std::sync::Arc;

/// Build the recorder selected in configuration
pub fn create_recorder(kind: RecorderKind, clips_dir: PathBuf) -> Arc<dyn AudioRecorder> {
    match kind {
        RecorderKind::Arecord => Arc::new(ArecordRecorder::new(clips_dir)),
        RecorderKind::Silent => Arc::new(SilentClipRecorder::new(clips_dir)),
    }
}
