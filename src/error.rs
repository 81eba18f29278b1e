//! Error types used by the containervisor runtime.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`] - fatal conditions that end a supervision run.
//! - [`ControlError`] - failures of individual control-plane calls.
//! - [`ConfigError`] - configuration rejected before supervision starts.
//!
//! All of them provide `as_label` for logs, mirroring one another.

use std::time::Duration;
use thiserror::Error;

/// # Errors that terminate a supervision run.
///
/// Every variant is fatal: the process is expected to log it and exit with
/// a non-zero status so the host supervisor can decide whether to restart us.
/// Transient confirmation failures never surface here until the confirm
/// budget is spent.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The control plane could not be reached for this attempt.
    #[error("cannot connect to control plane: {source}")]
    Connect {
        #[source]
        source: ControlError,
    },

    /// Inspecting the container failed (unknown reference or unreachable control plane).
    #[error("cannot inspect container {container}: {source}")]
    Inspect {
        container: String,
        #[source]
        source: ControlError,
    },

    /// The start call itself was rejected.
    #[error("cannot start container {container}: {source}")]
    Start {
        container: String,
        #[source]
        source: ControlError,
    },

    /// The container never reached `running` within the start budget.
    #[error("could not start container {container} after {attempts} start attempt(s)")]
    StartExhausted { container: String, attempts: u32 },

    /// Liveness confirmation kept failing until the confirm budget ran out.
    #[error("could not confirm container {container} after {attempts} check(s)")]
    ConfirmExhausted { container: String, attempts: u32 },

    /// The remote exit notification could not be established or failed.
    #[error("exit notification for container {container} failed: {source}")]
    ExitSubscription {
        container: String,
        #[source]
        source: ControlError,
    },

    /// OS signal listeners could not be registered.
    #[error("cannot register signal handlers: {0}")]
    Signals(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use containervisor::RuntimeError;
    ///
    /// let err = RuntimeError::StartExhausted { container: "web-1".into(), attempts: 3 };
    /// assert_eq!(err.as_label(), "runtime_start_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Connect { .. } => "runtime_connect",
            RuntimeError::Inspect { .. } => "runtime_inspect",
            RuntimeError::Start { .. } => "runtime_start",
            RuntimeError::StartExhausted { .. } => "runtime_start_exhausted",
            RuntimeError::ConfirmExhausted { .. } => "runtime_confirm_exhausted",
            RuntimeError::ExitSubscription { .. } => "runtime_exit_subscription",
            RuntimeError::Signals(_) => "runtime_signals",
        }
    }
}

/// # Errors produced by control-plane calls.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Client could not be constructed (bad host, missing certificates, ...).
    #[error("connection failed: {0}")]
    Connection(String),

    /// No container with the given reference exists.
    #[error("no such container: {0}")]
    NotFound(String),

    /// The control plane answered with an error.
    #[error("request failed: {0}")]
    Request(String),

    /// The response was missing data the supervisor needs.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::Connection(_) => "control_connection",
            ControlError::NotFound(_) => "control_not_found",
            ControlError::Request(_) => "control_request",
            ControlError::Malformed(_) => "control_malformed",
        }
    }
}

/// # Configuration errors.
///
/// Raised while resolving [`SupervisorConfig`](crate::SupervisorConfig),
/// before any supervision logic runs.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("name or id of container is missing")]
    MissingContainer,

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("cgroup check depends upon process check")]
    CgroupWithoutProcessCheck,

    #[error("cgroup format {0:?} must contain the {{id}} placeholder")]
    CgroupFormat(String),

    #[error("invalid duration {input:?}: {reason}")]
    Duration { input: String, reason: String },

    #[error("restart delay {first:?} exceeds its maximum {max:?}")]
    RestartDelay { first: Duration, max: Duration },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingContainer => "config_missing_container",
            ConfigError::NotPositive { .. } => "config_not_positive",
            ConfigError::CgroupWithoutProcessCheck => "config_cgroup_without_pid",
            ConfigError::CgroupFormat(_) => "config_cgroup_format",
            ConfigError::Duration { .. } => "config_duration",
            ConfigError::RestartDelay { .. } => "config_restart_delay",
        }
    }
}
