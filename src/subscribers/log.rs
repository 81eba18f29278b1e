//! # LogWriter - lifecycle events as `tracing` records
//!
//! ## Example output
//! ```text
//! INFO inspected container container="web-1" status="exited" pid=0
//! INFO starting container container="web-1" attempt=1
//! INFO container is ready container="web-1" pid=4242
//! INFO container exited, restarting container="web-1" source=liveness-poll
//! WARN graceful stop failed container="web-1" error="..."
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logs every supervision event.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let container = e.container.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::Inspected => {
                info!(container, status = ?e.status, pid = ?e.pid, "inspected container");
            }
            EventKind::StartRequested => {
                info!(container, attempt = ?e.attempt, "starting container");
            }
            EventKind::Started => {
                info!(container, "successfully started container");
            }
            EventKind::ConfirmFailed => {
                warn!(container, pid = ?e.pid, failures = ?e.attempt, reason = ?e.reason, "liveness confirmation failed");
            }
            EventKind::Ready => {
                info!(container, pid = ?e.pid, "container is ready");
            }
            EventKind::RestartScheduled => {
                info!(
                    container,
                    source = ?e.source.map(|s| s.to_string()),
                    exit_code = ?e.exit_code,
                    "container exited, restarting"
                );
            }
            EventKind::BackoffScheduled => {
                info!(container, delay_ms = ?e.delay_ms, short_runs = ?e.attempt, "delaying restart");
            }
            EventKind::StopRequested => {
                info!(container, "stopping container due to system signal");
            }
            EventKind::Stopped => {
                info!(container, "successfully stopped container");
            }
            EventKind::StopFailed => {
                warn!(container, error = ?e.reason, "graceful stop failed");
            }
            EventKind::Detached => {
                info!(container, "detaching, container is left running");
            }
            EventKind::Cancelled => {
                info!(container, "supervision cancelled");
            }
            EventKind::SupervisionFailed => {
                error!(container, error = ?e.reason, "supervision failed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
