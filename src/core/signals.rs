//! # Signal relay.
//!
//! Translates `SIGINT` and `SIGTERM` into stop intents:
//!
//! ```text
//!   SIGINT  ──► StopBehavior::on_interrupt  ─┐
//!                                            ├──► mpsc::Sender<StopIntent>
//!   SIGTERM ──► StopBehavior::on_terminate  ─┘
//! ```
//!
//! Listeners are registered before the relay task is spawned, so a
//! registration failure surfaces to the caller. The task ends (dropping its
//! listeners) when the token is cancelled or the receiver goes away.

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::StopBehavior;
use crate::error::RuntimeError;

/// `true` stops the container before exiting; `false` detaches.
pub type StopIntent = bool;

/// Registers the signal listeners and spawns the relay task.
///
/// Must be called within a tokio runtime.
pub fn spawn_signal_relay(
    token: CancellationToken,
    behavior: StopBehavior,
    intents: mpsc::Sender<StopIntent>,
) -> Result<JoinHandle<()>, RuntimeError> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let (name, intent) = tokio::select! {
                _ = token.cancelled() => break,
                Some(()) = sigint.recv() => ("SIGINT", behavior.on_interrupt),
                Some(()) = sigterm.recv() => ("SIGTERM", behavior.on_terminate),
                else => break,
            };
            info!(signal = name, stop = intent, "received termination signal");

            tokio::select! {
                _ = token.cancelled() => break,
                sent = intents.send(intent) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    }))
}
