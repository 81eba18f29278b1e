//! # HostRelay - forwards transitions to the host supervisor
//!
//! | Event               | Host update                         |
//! |---------------------|-------------------------------------|
//! | `Inspected`         | `STATUS=<status> [<health>]`        |
//! | `Ready`             | `READY=1`                           |
//! | `RestartScheduled`  | `RELOADING=1`                       |
//! | `StopRequested`     | `STOPPING=1`                        |
//! | `StopFailed`        | `STATUS=stop failed: <error>`       |
//! | `SupervisionFailed` | `STATUS=failed: <error>`            |
//!
//! Failures and unsupported channels are logged and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::events::{Event, EventKind};
use crate::notify::{Delivery, HostNotifier, HostState};
use crate::subscribers::Subscribe;

/// Subscriber relaying supervision events to a [`HostNotifier`].
pub struct HostRelay {
    notifier: Arc<dyn HostNotifier>,
}

impl HostRelay {
    pub fn new(notifier: Arc<dyn HostNotifier>) -> Self {
        Self { notifier }
    }

    fn host_state(e: &Event) -> Option<HostState> {
        let reason = || e.reason.as_deref().unwrap_or("unknown error");
        match e.kind {
            EventKind::Inspected => e.status.as_deref().map(|s| HostState::Status(s.to_string())),
            EventKind::Ready => Some(HostState::Ready),
            EventKind::RestartScheduled => Some(HostState::Reloading),
            EventKind::StopRequested => Some(HostState::Stopping),
            EventKind::StopFailed => Some(HostState::Status(format!("stop failed: {}", reason()))),
            EventKind::SupervisionFailed => Some(HostState::Status(format!("failed: {}", reason()))),
            _ => None,
        }
    }
}

#[async_trait]
impl Subscribe for HostRelay {
    async fn on_event(&self, e: &Event) {
        let Some(state) = Self::host_state(e) else {
            return;
        };
        match self.notifier.notify(&state) {
            Ok(Delivery::Sent) => debug!(?state, "notified host"),
            Ok(Delivery::Unsupported) => debug!(?state, "host notification unsupported"),
            Err(err) => warn!(?state, error = %err, "host notification failed"),
        }
    }

    fn name(&self) -> &'static str {
        "host-relay"
    }
}
