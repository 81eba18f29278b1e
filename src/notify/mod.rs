//! Host supervision channel.
//!
//! [`HostNotifier`] sends one state update to whatever supervises this
//! process. [`SystemdNotifier`] speaks the `sd_notify(3)` protocol.
//! Sends are fire-and-forget: the caller only logs failures.

use std::io;

use sd_notify::NotifyState;

/// State update for the host supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostState {
    /// `READY=1`: the container is confirmed and watched.
    Ready,
    /// `RELOADING=1`: a restart cycle begins.
    Reloading,
    /// `STOPPING=1`: the container is about to be stopped.
    Stopping,
    /// `STATUS=...`: free-form status line.
    Status(String),
}

/// Outcome of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The host does not listen (e.g. not started by systemd).
    Unsupported,
}

/// Sends state updates to the host supervisor.
pub trait HostNotifier: Send + Sync + 'static {
    fn notify(&self, state: &HostState) -> io::Result<Delivery>;
}

/// `sd_notify` over the datagram socket named by `NOTIFY_SOCKET`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemdNotifier;

impl HostNotifier for SystemdNotifier {
    fn notify(&self, state: &HostState) -> io::Result<Delivery> {
        if std::env::var_os("NOTIFY_SOCKET").is_none() {
            return Ok(Delivery::Unsupported);
        }
        let sd_state = match state {
            HostState::Ready => NotifyState::Ready,
            HostState::Reloading => NotifyState::Reloading,
            HostState::Stopping => NotifyState::Stopping,
            HostState::Status(line) => NotifyState::Status(line.as_str()),
        };
        sd_notify::notify(false, &[sd_state])?;
        Ok(Delivery::Sent)
    }
}
