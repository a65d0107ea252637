use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{error, info, warn};

use super::recorder::{AudioRecorder, CaptureError, ClipRequest};

/// How scheduled captures run relative to the tick loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureDispatch {
    /// Spawned on the runtime, at most one in flight
    #[default]
    Background,
    /// Awaited inside the tick that requested it
    Inline,
}

/// Capture counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub requested: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Deferred requests still queued when the session ended
    pub dropped: u32,
}

/// Time a capture may overrun its clip length before it is abandoned
pub const CAPTURE_GRACE: Duration = Duration::from_secs(5);

struct InFlight {
    request: ClipRequest,
    handle: JoinHandle<Result<std::path::PathBuf, CaptureError>>,
    deadline: Instant,
}

/// Runs clip requests against a recorder without stalling the tick loop
///
/// A request that arrives while another capture is still running is
/// deferred and launched on a later tick once the slot frees up. No
/// capture is waited on past its clip length plus [`CAPTURE_GRACE`].
pub struct ClipDispatcher {
    recorder: Arc<dyn AudioRecorder>,
    mode: CaptureDispatch,
    in_flight: Option<InFlight>,
    deferred: VecDeque<ClipRequest>,
    stats: DispatchStats,
}

impl ClipDispatcher {
    pub fn new(recorder: Arc<dyn AudioRecorder>, mode: CaptureDispatch) -> Self {
        info!("Clip dispatcher using {} ({:?})", recorder.name(), mode);

        Self {
            recorder,
            mode,
            in_flight: None,
            deferred: VecDeque::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Hand over a newly scheduled request
    pub async fn submit(&mut self, request: ClipRequest) {
        self.stats.requested += 1;

        match self.mode {
            CaptureDispatch::Inline => {
                let limit = capture_limit(&request);
                let result =
                    match timeout(limit, self.recorder.capture_clip(&request.name, request.duration))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(timed_out(&request, limit)),
                    };
                self.record_result(&request, result);
            }
            CaptureDispatch::Background => {
                self.reap().await;
                if self.in_flight.is_none() {
                    self.launch(request);
                } else {
                    warn!(
                        "Capture {} deferred: previous clip still recording",
                        request.name
                    );
                    self.deferred.push_back(request);
                }
            }
        }
    }

    /// Called once per tick: collect a finished capture and start the
    /// next deferred one
    pub async fn poll(&mut self) {
        self.reap().await;

        if self.in_flight.is_none() {
            if let Some(request) = self.deferred.pop_front() {
                self.launch(request);
            }
        }
    }

    /// Wait for the in-flight capture (until its deadline) and drop
    /// anything still deferred
    pub async fn finish(mut self) -> DispatchStats {
        if let Some(mut in_flight) = self.in_flight.take() {
            info!("Waiting for capture {} to finish", in_flight.request.name);
            let result = match timeout_at(in_flight.deadline, &mut in_flight.handle).await {
                Ok(joined) => join_result(joined),
                Err(_) => {
                    in_flight.handle.abort();
                    Err(timed_out(&in_flight.request, capture_limit(&in_flight.request)))
                }
            };
            self.record_result(&in_flight.request, result);
        }

        for request in self.deferred.drain(..) {
            warn!("Dropping deferred capture {}: session ended", request.name);
            self.stats.dropped += 1;
        }

        self.stats
    }

    fn launch(&mut self, request: ClipRequest) {
        let recorder = Arc::clone(&self.recorder);
        let name = request.name.clone();
        let duration = request.duration;

        let deadline = Instant::now() + capture_limit(&request);

        let handle = tokio::spawn(async move { recorder.capture_clip(&name, duration).await });

        self.in_flight = Some(InFlight {
            request,
            handle,
            deadline,
        });
    }

    /// Collect a finished capture, or abandon one that ran past its deadline
    async fn reap(&mut self) {
        let Some(in_flight) = self.in_flight.as_ref() else {
            return;
        };

        if in_flight.handle.is_finished() {
            if let Some(in_flight) = self.in_flight.take() {
                let result = join_result(in_flight.handle.await);
                self.record_result(&in_flight.request, result);
            }
        } else if Instant::now() >= in_flight.deadline {
            if let Some(in_flight) = self.in_flight.take() {
                in_flight.handle.abort();
                let err = timed_out(&in_flight.request, capture_limit(&in_flight.request));
                self.record_result(&in_flight.request, Err(err));
            }
        }
    }

    fn record_result(
        &mut self,
        request: &ClipRequest,
        result: Result<std::path::PathBuf, CaptureError>,
    ) {
        match result {
            Ok(path) => {
                info!("Captured {} -> {}", request.name, path.display());
                self.stats.succeeded += 1;
            }
            Err(e) => {
                error!("Capture {} failed: {}", request.name, e);
                self.stats.failed += 1;
            }
        }
    }
}

fn capture_limit(request: &ClipRequest) -> Duration {
    request.duration + CAPTURE_GRACE
}

fn timed_out(request: &ClipRequest, limit: Duration) -> CaptureError {
    CaptureError::TimedOut {
        name: request.name.clone(),
        limit,
    }
}

fn join_result(
    joined: Result<Result<std::path::PathBuf, CaptureError>, tokio::task::JoinError>,
) -> Result<std::path::PathBuf, CaptureError> {
    joined.unwrap_or_else(|e| Err(CaptureError::Task(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sleeps for the clip duration and remembers what it was asked for
    struct SlowRecorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl AudioRecorder for SlowRecorder {
        async fn capture_clip(&self, name: &str, duration: Duration) -> Result<PathBuf, CaptureError> {
            self.calls.lock().unwrap().push(name.to_string());
            tokio::time::sleep(duration).await;
            if self.fail {
                Err(CaptureError::Task("mic unplugged".to_string()))
            } else {
                Ok(PathBuf::from(format!("{}.wav", name)))
            }
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn recorder(fail: bool) -> Arc<SlowRecorder> {
        Arc::new(SlowRecorder {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_request_is_deferred() {
        let rec = recorder(false);
        let mut dispatcher = ClipDispatcher::new(rec.clone(), CaptureDispatch::Background);

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;
        dispatcher.submit(ClipRequest::new(1, Duration::from_secs(5))).await;

        assert!(dispatcher.is_busy());
        assert_eq!(dispatcher.deferred_len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        dispatcher.poll().await;

        assert_eq!(dispatcher.deferred_len(), 0);
        assert_eq!(dispatcher.stats().succeeded, 1);

        let stats = dispatcher.finish().await;
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.dropped, 0);
        assert_eq!(*rec.calls.lock().unwrap(), vec!["audio0", "audio1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_drops_deferred_requests() {
        let rec = recorder(false);
        let mut dispatcher = ClipDispatcher::new(rec.clone(), CaptureDispatch::Background);

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;
        dispatcher.submit(ClipRequest::new(1, Duration::from_secs(5))).await;

        let stats = dispatcher.finish().await;
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(rec.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_failure_is_counted() {
        let rec = recorder(true);
        let mut dispatcher = ClipDispatcher::new(rec, CaptureDispatch::Inline);

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;

        assert!(!dispatcher.is_busy());
        let stats = dispatcher.finish().await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 0);
    }

    /// Never finishes a capture
    struct StuckRecorder;

    #[async_trait::async_trait]
    impl AudioRecorder for StuckRecorder {
        async fn capture_clip(&self, _name: &str, _duration: Duration) -> Result<PathBuf, CaptureError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "stuck"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_abandons_stuck_capture_at_deadline() {
        let mut dispatcher = ClipDispatcher::new(Arc::new(StuckRecorder), CaptureDispatch::Background);
        let started = Instant::now();

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;
        let stats = dispatcher.finish().await;

        assert_eq!(started.elapsed(), Duration::from_secs(5) + CAPTURE_GRACE);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_frees_slot_held_by_stuck_capture() {
        let mut dispatcher = ClipDispatcher::new(Arc::new(StuckRecorder), CaptureDispatch::Background);

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;
        dispatcher.submit(ClipRequest::new(1, Duration::from_secs(5))).await;
        assert_eq!(dispatcher.deferred_len(), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        dispatcher.poll().await;
        assert_eq!(dispatcher.deferred_len(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        dispatcher.poll().await;

        // audio0 abandoned, audio1 launched in its place
        assert_eq!(dispatcher.stats().failed, 1);
        assert_eq!(dispatcher.deferred_len(), 0);
        assert!(dispatcher.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_stuck_capture_is_bounded() {
        let mut dispatcher = ClipDispatcher::new(Arc::new(StuckRecorder), CaptureDispatch::Inline);
        let started = Instant::now();

        dispatcher.submit(ClipRequest::new(0, Duration::from_secs(5))).await;

        assert_eq!(started.elapsed(), Duration::from_secs(5) + CAPTURE_GRACE);
        assert_eq!(dispatcher.stats().failed, 1);
    }
}
