// Integration tests for collector delivery
//
// Each test stands up an in-process axum server playing the collector.

mod common;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use common::{absent, present, ClockedRecorder};
use serde_json::{json, Value};
use shower_sense::telemetry::{SkipReason, HARDWARE_INPUT_PATH};
use shower_sense::{
    DeliveryOutcome, MonitorConfig, ReplaySensors, ScriptedReading, SessionLoop, SessionOutcome,
    SessionRecord, SessionSink, TelemetryReporter, TransportErrorKind,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

type Received = Arc<Mutex<Vec<Value>>>;

fn success_body() -> Value {
    json!({
        "success": true,
        "data": {
            "points": 85,
            "cleanEnvCoins": 2,
            "soapTokenCoins": 1,
            "blockchainSync": { "status": "pending" },
            "lifetimeTotal": { "points": 400, "showers": 6, "cleanEnvCoins": 14, "soapTokenCoins": 5 }
        }
    })
}

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn_collector(router: Router) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(format!("http://{}", addr))
}

/// Collector that records request bodies and answers with `status` + `body`
async fn recording_collector(status: StatusCode, body: Value) -> Result<(String, Received)> {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    let router = Router::new()
        .route(
            HARDWARE_INPUT_PATH,
            post(
                move |State(received): State<Received>, Json(payload): Json<Value>| {
                    let body = body.clone();
                    async move {
                        received.lock().unwrap().push(payload);
                        (status, Json(body))
                    }
                },
            ),
        )
        .with_state(received.clone());

    Ok((spawn_collector(router).await?, received))
}

fn finished_record(elapsed_secs: u64, peak: f64) -> SessionRecord {
    let mut record = SessionRecord::new("telemetry-test");
    record.elapsed = Duration::from_secs(elapsed_secs);
    record.max_temperature_c = peak;
    record.freeze()
}

fn reporter(base_url: &str, timeout: Duration) -> Result<TelemetryReporter> {
    TelemetryReporter::with_timeout(base_url, "wallet-1", timeout)
}

#[tokio::test]
async fn test_delivered_report_carries_session_stats() -> Result<()> {
    let (url, received) = recording_collector(StatusCode::OK, success_body()).await?;
    let reporter = reporter(&url, Duration::from_secs(5))?;

    let outcome = reporter.report(&finished_record(312, 39.127)).await;

    match outcome {
        DeliveryOutcome::Delivered(ack) => {
            assert_eq!(ack.points, 85.0);
            assert_eq!(ack.blockchain_sync.status, "pending");
            assert_eq!(ack.lifetime_total.showers, 6);
        }
        other => panic!("expected delivery, got {:?}", other),
    }

    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({ "walletAddress": "wallet-1", "actualTime": 312, "actualTemp": 39.13 })
    );

    Ok(())
}

#[tokio::test]
async fn test_business_error_is_rejection() -> Result<()> {
    let (url, _) = recording_collector(
        StatusCode::OK,
        json!({ "success": false, "error": "Daily shower limit reached" }),
    )
    .await?;

    let outcome = reporter(&url, Duration::from_secs(5))?
        .report(&finished_record(60, 37.0))
        .await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Rejected {
            status: Some(200),
            reason: "Daily shower limit reached".to_string(),
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_error_status_is_rejection_with_server_reason() -> Result<()> {
    let (url, _) = recording_collector(
        StatusCode::NOT_FOUND,
        json!({ "success": false, "error": "User not found. Please complete profile setup first." }),
    )
    .await?;

    let outcome = reporter(&url, Duration::from_secs(5))?
        .report(&finished_record(60, 37.0))
        .await;

    match outcome {
        DeliveryOutcome::Rejected { status, reason } => {
            assert_eq!(status, Some(404));
            assert!(reason.starts_with("User not found"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_slow_collector_is_timeout() -> Result<()> {
    let router = Router::new().route(
        HARDWARE_INPUT_PATH,
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(success_body())
        }),
    );
    let url = spawn_collector(router).await?;

    let outcome = reporter(&url, Duration::from_millis(200))?
        .report(&finished_record(60, 37.0))
        .await;

    match outcome {
        DeliveryOutcome::TransportFailure { kind, .. } => {
            assert_eq!(kind, TransportErrorKind::Timeout)
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_unreachable_collector_is_connection_failure() -> Result<()> {
    // Reserve a port, then free it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let outcome = reporter(&format!("http://{}", addr), Duration::from_secs(5))?
        .report(&finished_record(60, 37.0))
        .await;

    match outcome {
        DeliveryOutcome::TransportFailure { kind, .. } => {
            assert_eq!(kind, TransportErrorKind::Connection)
        }
        other => panic!("expected connection failure, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_guarded_records_never_reach_the_network() -> Result<()> {
    let (url, received) = recording_collector(StatusCode::OK, success_body()).await?;
    let reporter = reporter(&url, Duration::from_secs(5))?;

    let zero_length = finished_record(0, 37.0);
    assert_eq!(
        reporter.report(&zero_length).await,
        DeliveryOutcome::Skipped {
            reason: SkipReason::NoElapsedTime
        }
    );

    let mut still_running = SessionRecord::new("running");
    still_running.elapsed = Duration::from_secs(90);
    still_running.max_temperature_c = 37.0;
    assert_eq!(
        reporter.report(&still_running).await,
        DeliveryOutcome::Skipped {
            reason: SkipReason::NotStopped
        }
    );

    assert!(received.lock().unwrap().is_empty());

    Ok(())
}

/// Lets the session tick on a paused clock, then resumes real time for
/// the network call
struct ResumingSink(TelemetryReporter);

#[async_trait::async_trait]
impl SessionSink for ResumingSink {
    async fn deliver(&self, record: &SessionRecord) -> DeliveryOutcome {
        tokio::time::resume();
        self.0.report(record).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_session_posts_once() -> Result<()> {
    let (url, received) = recording_collector(StatusCode::OK, success_body()).await?;
    let sink = Arc::new(ResumingSink(reporter(&url, Duration::from_secs(30))?));

    let mut script: Vec<ScriptedReading> = (0..24).map(|i| present(20.0 + i as f64)).collect();
    script.push(absent());

    let session = SessionLoop::new(
        "full-session",
        MonitorConfig::default(),
        Box::new(ReplaySensors::new("script", script)),
        Arc::new(ClockedRecorder::new()),
        sink,
    )?;

    let report = session.run().await;

    assert!(matches!(
        report.outcome,
        SessionOutcome::Completed {
            delivery: DeliveryOutcome::Delivered(_)
        }
    ));

    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["actualTime"], 49);
    assert_eq!(bodies[0]["actualTemp"], 43.0);

    Ok(())
}
