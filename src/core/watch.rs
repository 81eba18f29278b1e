//! # Watchers of the watch phase.
//!
//! Two sources feed one [`Race`](super::race::Race):
//!
//! | Watcher            | Reports                                             |
//! |--------------------|-----------------------------------------------------|
//! | [`remote_exit`]    | `Restart` on exit notice, `Fatal` on stream failure |
//! | [`local_liveness`] | `Restart` on the first failed poll                  |
//!
//! Stop intents are received by the supervisor itself, next to the race, so
//! an intent is only taken off the channel when it decides the watch phase.

use std::time::Duration;

use tracing::debug;

use crate::control::ControlRef;
use crate::error::RuntimeError;
use crate::events::ExitSource;
use crate::probes::Probes;

use super::signals::StopIntent;

/// What ended a watch phase.
#[derive(Debug)]
pub(crate) enum WatchOutcome {
    Restart {
        source: ExitSource,
        exit_code: Option<i64>,
    },
    Stop,
    Detach,
    Fatal(RuntimeError),
}

impl From<StopIntent> for WatchOutcome {
    fn from(intent: StopIntent) -> Self {
        if intent {
            WatchOutcome::Stop
        } else {
            WatchOutcome::Detach
        }
    }
}

/// Waits for the control plane to report that the container stopped running.
pub(crate) async fn remote_exit(plane: ControlRef, container: String) -> Option<WatchOutcome> {
    match plane.wait_exit(&container).await {
        Ok(notice) => Some(WatchOutcome::Restart {
            source: ExitSource::Remote,
            exit_code: Some(notice.exit_code),
        }),
        Err(source) => Some(WatchOutcome::Fatal(RuntimeError::ExitSubscription {
            container,
            source,
        })),
    }
}

/// Polls the process (and, when given, its cgroup) every `interval`.
pub(crate) async fn local_liveness(
    probes: Probes,
    pid: i32,
    group_path: Option<String>,
    interval: Duration,
) -> Option<WatchOutcome> {
    loop {
        tokio::time::sleep(interval).await;

        let alive = probes.process.is_alive(pid);
        let contained = match (&group_path, alive) {
            (Some(path), true) => probes.group.is_in_group(pid, path),
            _ => alive,
        };
        if !contained {
            debug!(pid, alive, "liveness poll failed");
            return Some(WatchOutcome::Restart {
                source: ExitSource::Local,
                exit_code: None,
            });
        }
    }
}
