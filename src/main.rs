use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shower_sense::session::{new_session_id, prepare_audio};
use shower_sense::{create_router, AppState, Config, ConfiguredLauncher, SessionLauncher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "shower-sense")]
#[command(about = "Shower session monitor")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/shower-sense")]
    config: String,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor one session, report it, and exit
    Run {
        /// Sensor script to replay (overrides sensors.script)
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Serve the start/stop control API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let cfg = Config::load(&args.config)?;

    info!("Shower Sense v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Collector: {}", cfg.telemetry.collector_url);

    prepare_audio(&cfg.audio).await;

    match args.command {
        Command::Run { script } => {
            let mut launcher = ConfiguredLauncher::new(&cfg)?;
            if let Some(script) = script {
                launcher = launcher.with_script(script);
            }

            let cancel = CancellationToken::new();
            let session = launcher.launch(new_session_id(), cancel.clone())?;

            // Ctrl-C is the external stop signal
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping session");
                    cancel.cancel();
                }
            });

            let report = session.run().await;
            info!(
                "Session {} finished: {}s, {} clips captured",
                report.record.session_id,
                report.record.elapsed_seconds(),
                report.captures.succeeded
            );

            Ok(report.exit_code())
        }
        Command::Serve => {
            let launcher = ConfiguredLauncher::new(&cfg)?;
            let app = create_router(AppState::new(Arc::new(launcher)));

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("Control API listening on {}", addr);
            axum::serve(listener, app)
                .await
                .context("HTTP server failed")?;

            Ok(0)
        }
    }
}
