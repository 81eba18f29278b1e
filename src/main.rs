//! containervisor - keeps one Docker container alive under systemd.
//!
//! # Usage
//!
//! ```bash
//! # Supervise a container with defaults (SIGTERM stops it, SIGINT detaches)
//! containervisor --container web-1
//!
//! # Same, configured from a unit file
//! CONTAINER=web-1 STOP_TIMEOUT=30s USE_CGROUP=false containervisor
//! ```
//!
//! Exit status is 0 after a stop, a detach or cancellation and 1 after a
//! fatal supervision error or a rejected configuration.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use containervisor::cli::Settings;
use containervisor::{
    CgroupFs, Cli, DockerConnector, LogWriter, Outcome, Probes, RuntimeError, SignalProbe,
    Subscribe, Supervisor, spawn_signal_relay,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Pending stop intents; signals beyond this are redundant.
const INTENT_QUEUE: usize = 4;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(settings: Settings) -> Result<Outcome, RuntimeError> {
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::channel(INTENT_QUEUE);
    let relay = spawn_signal_relay(token.clone(), settings.supervisor.stop, tx)?;

    let probes = Probes::new(
        Arc::new(SignalProbe),
        Arc::new(CgroupFs::new(settings.cgroup_root)),
    );
    let connector = Arc::new(DockerConnector::new(settings.docker));

    info!(container = %settings.supervisor.container, "supervising container");
    let sup = Supervisor::builder(settings.supervisor, connector)
        .with_probes(probes)
        .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
        .build();

    let res = sup.run(token.clone(), rx).await;
    token.cancel();
    let _ = relay.await;
    res
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, label = err.as_label(), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(outcome) => {
            info!(?outcome, "supervision finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, label = err.as_label(), "supervision failed");
            ExitCode::FAILURE
        }
    }
}
