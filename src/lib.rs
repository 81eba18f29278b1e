//! # containervisor
//!
//! **Containervisor** keeps one Docker container alive on behalf of a host
//! process supervisor (systemd).
//!
//! It starts the container within a bounded number of attempts, confirms
//! that its entrypoint really runs (pid probe plus cgroup membership), then
//! watches it through two independent channels and restarts it when it
//! dies. A termination signal either stops the container gracefully or
//! detaches from it, depending on configuration.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   SIGINT / SIGTERM                         Docker Engine (bollard)
//!          │                                  ▲            │
//!          ▼                                  │ inspect    │ wait(not-running)
//!   ┌──────────────┐   StopIntent   ┌─────────┴────────────▼──────────────┐
//!   │ signal relay ├───────────────►│  Supervisor (state machine)         │
//!   └──────────────┘     (mpsc)     │  - RetryBudget per attempt          │
//!                                   │  - Race { remote, local } + intent  │
//!                                   │  - Probes { kill(pid,0), cgroup }   │
//!                                   └──────────────────┬──────────────────┘
//!                                                      │ emit(Event)
//!                                                      ▼
//!                                               SubscriberSet
//!                                       ┌──────────────┼──────────────┐
//!                                       ▼              ▼              ▼
//!                                   LogWriter      HostRelay       custom
//!                                   (tracing)     (sd_notify)
//! ```
//!
//! ### Lifecycle
//! ```text
//! loop {                                         (one supervision attempt)
//!   ├─► connect control plane, fresh RetryBudget
//!   ├─► Inspecting ──► not running ──► Starting (budget) ──► Inspecting
//!   ├─► running ──► Confirming (pid alive && in cgroup)
//!   │                 └─ failure ──► budget left? Inspecting : Err(ConfirmExhausted)
//!   ├─► Watching: first of
//!   │     ├─ remote exit   ──► RestartScheduled ──► backoff ──► continue
//!   │     ├─ local poll    ──► RestartScheduled ──► backoff ──► continue
//!   │     ├─ intent=true   ──► Stopping ──► Ok(Outcome::Stopped)
//!   │     └─ intent=false  ──► Ok(Outcome::Detached)
//!   └─► context cancelled ──► Ok(Outcome::Cancelled)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | State machine, watchers, signal relay.                   | [`Supervisor`], [`Outcome`]                 |
//! | **Control plane** | Remote container operations.                             | [`ControlPlane`], [`Connect`], [`DockerConnector`] |
//! | **Probes**        | Local liveness checks.                                   | [`ProcessProbe`], [`GroupProbe`]            |
//! | **Subscriber API**| Hook into lifecycle events.                              | [`Subscribe`], [`LogWriter`], [`HostRelay`] |
//! | **Policies**      | Restart pacing.                                          | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**        | Typed errors with stable labels.                         | [`RuntimeError`], [`ControlError`], [`ConfigError`] |
//! | **Configuration** | Immutable settings resolved once from flags and env.     | [`SupervisorConfig`], [`Cli`]               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use containervisor::{
//!     Connect, ControlError, ControlRef, Outcome, Supervisor, SupervisorConfig,
//! };
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Offline;
//!
//! impl Connect for Offline {
//!     fn connect(&self) -> Result<ControlRef, ControlError> {
//!         Err(ControlError::Connection("no daemon".into()))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = SupervisorConfig {
//!         notify_host: false,
//!         ..SupervisorConfig::new("web-1")
//!     };
//!     let sup = Supervisor::builder(cfg, Arc::new(Offline)).build();
//!
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     let (_tx, rx) = mpsc::channel(1);
//!     assert_eq!(sup.run(token, rx).await.unwrap(), Outcome::Cancelled);
//! }
//! ```

pub mod cli;
mod config;
pub mod control;
mod core;
mod error;
pub mod events;
pub mod notify;
pub mod policies;
pub mod probes;
pub mod subscribers;

// ---- Public re-exports ----

pub use cli::Cli;
pub use config::{
    CGROUP_ID_PLACEHOLDER, DEFAULT_CGROUP_FORMAT, StopBehavior, SupervisorConfig, parse_duration,
};
pub use control::{
    Connect, ContainerSnapshot, ContainerStatus, ControlPlane, ControlRef, DockerConnector,
    DockerOptions, ExitNotice,
};
pub use crate::core::{Outcome, StopIntent, Supervisor, SupervisorBuilder, spawn_signal_relay};
pub use error::{ConfigError, ControlError, RuntimeError};
pub use events::{Event, EventKind, ExitSource};
pub use notify::{Delivery, HostNotifier, HostState, SystemdNotifier};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use probes::{CgroupFs, GroupProbe, ProcessProbe, Probes, SignalProbe};
pub use subscribers::{HostRelay, LogWriter, Subscribe, SubscriberSet};
