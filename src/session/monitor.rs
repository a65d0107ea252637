use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregator::SessionAggregator;
use super::config::MonitorConfig;
use super::record::{LoopState, SessionRecord, SessionSnapshot};
use crate::audio::{AudioRecorder, AudioScheduler, ClipDispatcher, DispatchStats};
use crate::presence::{PresenceDebouncer, PresenceEvent};
use crate::sensors::{SensorPort, SensorSample};
use crate::telemetry::{DeliveryOutcome, SessionSink};

/// Everything the loop mutates, owned by exactly one session
struct SessionState {
    record: SessionRecord,
    debouncer: PresenceDebouncer,
    scheduler: AudioScheduler,
    phase: LoopState,
}

/// How a session finished
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Presence ended the session and the record went to telemetry
    Completed { delivery: DeliveryOutcome },
    /// Stopped from outside before presence ended it; nothing was sent
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub record: SessionRecord,
    pub outcome: SessionOutcome,
    pub captures: DispatchStats,
}

impl SessionReport {
    /// Process exit status for a one-shot run
    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            SessionOutcome::Completed { delivery } => match delivery {
                DeliveryOutcome::Delivered(_) => 0,
                DeliveryOutcome::Rejected { .. } => 2,
                DeliveryOutcome::TransportFailure { .. } => 3,
                DeliveryOutcome::Skipped { .. } => 4,
            },
            SessionOutcome::Cancelled => 5,
        }
    }
}

/// Fixed-period session control loop
///
/// Each tick reads the sensors, folds the sample into the record, lets the
/// capture schedule fire, and feeds the debouncer. The debouncer's `Ended`
/// is the only way the loop stops on its own.
pub struct SessionLoop {
    config: MonitorConfig,
    sensors: Box<dyn SensorPort>,
    aggregator: SessionAggregator,
    dispatcher: ClipDispatcher,
    sink: Arc<dyn SessionSink>,
    cancel: CancellationToken,
    status_tx: watch::Sender<SessionSnapshot>,
    state: SessionState,
}

impl SessionLoop {
    pub fn new(
        session_id: impl Into<String>,
        config: MonitorConfig,
        sensors: Box<dyn SensorPort>,
        recorder: Arc<dyn AudioRecorder>,
        sink: Arc<dyn SessionSink>,
    ) -> Result<Self> {
        config.validate()?;

        let session_id = session_id.into();
        info!(
            "Creating session {} (tick {}ms, absent threshold {}, capture every {} ticks)",
            session_id,
            config.tick_period_ms,
            config.absent_threshold,
            config.capture_interval_ticks
        );

        let state = SessionState {
            record: SessionRecord::new(session_id),
            debouncer: PresenceDebouncer::with_distance(
                config.sentinel_distance_cm,
                config.distance_match,
                config.absent_threshold,
            ),
            scheduler: AudioScheduler::new(config.capture_interval_ticks, config.clip_duration()),
            phase: LoopState::WaitingForStart,
        };

        let (status_tx, _) = watch::channel(snapshot(&state, None));

        Ok(Self {
            aggregator: SessionAggregator::new(config.tick_period()),
            dispatcher: ClipDispatcher::new(recorder, config.capture_dispatch),
            config,
            sensors,
            sink,
            cancel: CancellationToken::new(),
            status_tx,
            state,
        })
    }

    /// Stop the session from outside when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.state.record.session_id
    }

    /// Snapshots published after every tick
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.status_tx.subscribe()
    }

    /// Run until presence ends the session (or it is cancelled), then hand
    /// the frozen record to the sink
    pub async fn run(mut self) -> SessionReport {
        info!(
            "Session {} running (sensors: {})",
            self.state.record.session_id,
            self.sensors.name()
        );
        self.state.phase = LoopState::Running;
        self.publish(None);

        let mut ticker = interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        let ended = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(event) = self.tick().await {
                        break Some(event);
                    }
                }
                _ = cancel.cancelled() => {
                    break None;
                }
            }
        };

        let SessionLoop {
            dispatcher,
            sink,
            status_tx,
            mut state,
            ..
        } = self;

        let captures = dispatcher.finish().await;

        match ended {
            Some(PresenceEvent::Ended { absent_ticks }) => {
                let record = state.record.freeze();
                info!(
                    "Session {} stopped after {} ticks ({}s, {} absent), peak {:?}°C",
                    record.session_id,
                    record.ticks,
                    record.elapsed_seconds(),
                    absent_ticks,
                    record.peak_temperature()
                );

                state.record = record.clone();
                state.phase = LoopState::Stopped;
                status_tx.send_replace(snapshot(&state, None));

                let delivery = sink.deliver(&record).await;

                SessionReport {
                    record,
                    outcome: SessionOutcome::Completed { delivery },
                    captures,
                }
            }
            None => {
                warn!(
                    "Session {} cancelled after {} ticks; not reporting",
                    state.record.session_id, state.record.ticks
                );
                state.phase = LoopState::Cancelled;
                status_tx.send_replace(snapshot(&state, None));

                SessionReport {
                    record: state.record,
                    outcome: SessionOutcome::Cancelled,
                    captures,
                }
            }
        }
    }

    async fn tick(&mut self) -> Option<PresenceEvent> {
        let sample = SensorSample::collect(self.sensors.as_mut()).await;

        self.aggregator.apply(&mut self.state.record, &sample);

        self.dispatcher.poll().await;
        if let Some(request) = self.state.scheduler.tick() {
            debug!("Tick {} requests clip {}", self.state.record.ticks, request.name);
            self.dispatcher.submit(request).await;
        }

        let event = self.state.debouncer.observe(&sample);
        self.publish(Some(sample));

        event
    }

    fn publish(&self, last_sample: Option<SensorSample>) {
        self.status_tx.send_replace(snapshot(&self.state, last_sample));
    }
}

fn snapshot(state: &SessionState, last_sample: Option<SensorSample>) -> SessionSnapshot {
    SessionSnapshot {
        session_id: state.record.session_id.clone(),
        state: state.phase,
        ticks: state.record.ticks,
        elapsed_seconds: state.record.elapsed_seconds(),
        max_temperature_c: state.record.peak_temperature(),
        consecutive_absent_ticks: state.debouncer.consecutive_absent_ticks(),
        clips_requested: state.scheduler.clip_index(),
        last_sample,
    }
}
