//! Data returned by the control plane.

use std::fmt;

/// Lifecycle status reported by the control plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    /// The plane reported no or an unrecognised status.
    Unknown,
}

impl ContainerStatus {
    /// Returns the status as the control plane spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Unknown => "unknown",
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one inspect call. Never cached: every inspect yields a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSnapshot {
    /// Full container id.
    pub id: String,
    /// Display name (Docker prefixes it with `/`).
    pub name: String,
    pub status: ContainerStatus,
    /// Host pid of the entrypoint; `0` when not running.
    pub pid: i32,
    /// Health status, when the container defines a health check.
    pub health: Option<String>,
}

impl ContainerSnapshot {
    /// Renders the host status line: `running`, or `running [healthy]`.
    pub fn status_line(&self) -> String {
        match self.health.as_deref() {
            Some(health) if !health.is_empty() => format!("{} [{health}]", self.status),
            _ => self.status.to_string(),
        }
    }
}

/// Single-fire notification that the container stopped running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitNotice {
    pub exit_code: i64,
}
