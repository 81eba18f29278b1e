//! # Events emitted by the supervision state machine.
//!
//! The [`EventKind`] enum classifies events along the machine's states:
//! - **Inspecting/Starting**: `Inspected`, `StartRequested`
//! - **Confirming**: `ConfirmFailed`, `Ready`
//! - **Watching**: `RestartScheduled`, `BackoffScheduled`
//! - **Stopping/Terminal**: `StopRequested`, `Stopped`, `StopFailed`, `Detached`,
//!   `Cancelled`, `SupervisionFailed`
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use containervisor::{Event, EventKind, ExitSource};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_container("web-1")
//!     .with_source(ExitSource::Remote)
//!     .with_exit_code(137);
//!
//! assert_eq!(ev.kind, EventKind::RestartScheduled);
//! assert_eq!(ev.container.as_deref(), Some("web-1"));
//! assert_eq!(ev.exit_code, Some(137));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervision events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The container was inspected.
    ///
    /// Sets:
    /// - `container`, `pid`
    /// - `status`: status line, e.g. `running [healthy]`
    Inspected,

    /// A start call is about to be issued.
    ///
    /// Sets:
    /// - `container`
    /// - `attempt`: start attempt number (1-based, per supervision attempt)
    StartRequested,

    /// The start call succeeded.
    Started,

    /// A liveness confirmation failed.
    ///
    /// Sets:
    /// - `pid`
    /// - `attempt`: failed confirmations so far in this supervision attempt
    /// - `reason`: `process_gone` or `cgroup_mismatch`
    ConfirmFailed,

    /// The container is confirmed running and all watchers are armed.
    ///
    /// Sets:
    /// - `pid`
    Ready,

    /// A watcher detected an exit; a new supervision attempt follows.
    ///
    /// Sets:
    /// - `source`: which watcher fired
    /// - `exit_code`: when reported by the control plane
    RestartScheduled,

    /// The next supervision attempt is delayed.
    ///
    /// Sets:
    /// - `delay_ms`
    /// - `attempt`: consecutive short runs so far
    BackoffScheduled,

    /// A stop intent arrived; the container is about to be stopped.
    StopRequested,

    /// The graceful stop call succeeded.
    Stopped,

    /// The graceful stop call failed (logged, not fatal).
    ///
    /// Sets:
    /// - `reason`: error message
    StopFailed,

    /// A detach intent arrived; supervision ends with the container left running.
    Detached,

    /// The supervision context was cancelled from above.
    Cancelled,

    /// Supervision ends with a fatal error.
    ///
    /// Sets:
    /// - `reason`: error message
    SupervisionFailed,
}

/// Watcher that detected a container exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSource {
    /// The control plane's exit notification.
    Remote,
    /// The local liveness poll.
    Local,
}

impl fmt::Display for ExitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitSource::Remote => f.write_str("control-plane"),
            ExitSource::Local => f.write_str("liveness-poll"),
        }
    }
}

/// Supervision event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Container reference or name.
    pub container: Option<Arc<str>>,
    /// Rendered status line (status plus bracketed health).
    pub status: Option<Arc<str>>,
    /// Entrypoint pid.
    pub pid: Option<i32>,
    /// Attempt counter, meaning depends on the kind.
    pub attempt: Option<u32>,
    /// Watcher that detected an exit.
    pub source: Option<ExitSource>,
    /// Exit code reported by the control plane.
    pub exit_code: Option<i64>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, failure kinds).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            container: None,
            status: None,
            pid: None,
            attempt: None,
            source: None,
            exit_code: None,
            delay_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_container(mut self, container: impl Into<Arc<str>>) -> Self {
        self.container = Some(container.into());
        self
    }

    #[inline]
    pub fn with_status(mut self, status: impl Into<Arc<str>>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[inline]
    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_source(mut self, source: ExitSource) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
