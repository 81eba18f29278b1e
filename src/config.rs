//! # Supervision configuration.
//!
//! Provides [`SupervisorConfig`], the immutable settings of one supervisor
//! process, and [`StopBehavior`], the per-signal stop intents.
//!
//! A config is resolved exactly once (see [`crate::cli`]) and validated with
//! [`SupervisorConfig::validate`] before the state machine starts. Nothing
//! mutates it afterwards; the supervisor only reads it.
//!
//! ## Sentinel values
//! - `stop_timeout = None` → the control plane's default stop timeout
//! - `restart_backoff.first = 0s` → restart immediately after an exit

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Placeholder substituted by the container id in [`SupervisorConfig::cgroup_format`].
pub const CGROUP_ID_PLACEHOLDER: &str = "{id}";

/// Cgroup path template used by the Docker `cgroupfs` driver.
pub const DEFAULT_CGROUP_FORMAT: &str = "/docker/{id}/";

/// Stop intent configured per termination signal.
///
/// `true` means "stop the container, then exit"; `false` means "exit and
/// leave the container running".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopBehavior {
    /// Intent delivered on `SIGINT`.
    pub on_interrupt: bool,
    /// Intent delivered on `SIGTERM`.
    pub on_terminate: bool,
}

impl Default for StopBehavior {
    /// `SIGINT` detaches, `SIGTERM` stops (what `systemctl stop` sends).
    fn default() -> Self {
        Self {
            on_interrupt: false,
            on_terminate: true,
        }
    }
}

/// Configuration of one supervisor process.
///
/// ## Field semantics
/// - `start_tries`: start calls allowed per supervision attempt
/// - `check_tries`: failed liveness confirmations allowed per supervision attempt
/// - `check_interval`: local liveness poll period while watching
/// - `use_pid` / `use_cgroup`: enable the liveness detector / the cgroup guard
/// - `notify_host`: forward state to systemd
#[derive(Clone, Debug, PartialEq)]
pub struct SupervisorConfig {
    /// Name or id of the supervised container.
    pub container: String,
    /// Start attempts per supervision attempt.
    pub start_tries: u32,
    /// Confirm attempts per supervision attempt.
    pub check_tries: u32,
    /// Period of the local liveness poll.
    pub check_interval: Duration,
    /// Confirm liveness by probing the container's entrypoint pid.
    pub use_pid: bool,
    /// Additionally require the pid to live inside the container's cgroup.
    pub use_cgroup: bool,
    /// Send state updates to the host supervisor.
    pub notify_host: bool,
    /// Per-signal stop intents.
    pub stop: StopBehavior,
    /// Graceful stop timeout; `None` uses the control plane's default.
    pub stop_timeout: Option<Duration>,
    /// Cgroup path template; `{id}` is replaced by the container id.
    pub cgroup_format: String,
    /// Pacing between supervision attempts after a restart.
    pub restart_backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Creates a config for `container` with default settings.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }

    /// Checks invariants that cannot be expressed in the types.
    ///
    /// Rejects an empty container reference, zero budgets or interval,
    /// a cgroup check without process check and a template lacking `{id}`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container.trim().is_empty() {
            return Err(ConfigError::MissingContainer);
        }
        if self.start_tries == 0 {
            return Err(ConfigError::NotPositive { field: "start_tries" });
        }
        if self.check_tries == 0 {
            return Err(ConfigError::NotPositive { field: "check_tries" });
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "check_interval",
            });
        }
        if self.use_cgroup && !self.use_pid {
            return Err(ConfigError::CgroupWithoutProcessCheck);
        }
        if self.use_cgroup && !self.cgroup_format.contains(CGROUP_ID_PLACEHOLDER) {
            return Err(ConfigError::CgroupFormat(self.cgroup_format.clone()));
        }
        let backoff = &self.restart_backoff;
        if backoff.first > backoff.max {
            return Err(ConfigError::RestartDelay {
                first: backoff.first,
                max: backoff.max,
            });
        }
        Ok(())
    }

    /// Returns the cgroup path of the container with the given id.
    pub fn cgroup_path(&self, container_id: &str) -> String {
        self.cgroup_format
            .replace(CGROUP_ID_PLACEHOLDER, container_id)
    }

    /// Returns `true` if the cgroup guard applies to confirmations and polls.
    #[inline]
    pub fn group_check(&self) -> bool {
        self.use_pid && self.use_cgroup
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `start_tries = 3`, `check_tries = 3`
    /// - `check_interval = 500ms`
    /// - `use_pid`, `use_cgroup`, `notify_host` enabled
    /// - `stop = StopBehavior::default()`, `stop_timeout = None`
    /// - `cgroup_format = "/docker/{id}/"`
    /// - `restart_backoff = BackoffPolicy::default()` (no delay)
    fn default() -> Self {
        Self {
            container: String::new(),
            start_tries: 3,
            check_tries: 3,
            check_interval: Duration::from_millis(500),
            use_pid: true,
            use_cgroup: true,
            notify_host: true,
            stop: StopBehavior::default(),
            stop_timeout: None,
            cgroup_format: DEFAULT_CGROUP_FORMAT.to_string(),
            restart_backoff: BackoffPolicy::default(),
        }
    }
}

/// Parses a stop timeout like `"500ms"`, `"10s"`, `"1m30s"` or `"1h"`.
///
/// A bare number is read as seconds. Empty and zero inputs yield `None`,
/// meaning "use the control plane's default".
pub fn parse_duration(input: &str) -> Result<Option<Duration>, ConfigError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let invalid = |reason: String| ConfigError::Duration {
        input: input.to_string(),
        reason,
    };

    let mut total_ms: f64 = 0.0;
    let mut num = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() || ch == '.' {
            num.push(ch);
            continue;
        }
        let val: f64 = num
            .parse()
            .map_err(|_| invalid(format!("expected a number before '{ch}'")))?;
        num.clear();
        let scale = match ch {
            'h' => 3_600_000.0,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                1.0
            }
            'm' => 60_000.0,
            's' => 1_000.0,
            other => return Err(invalid(format!("unknown unit '{other}'"))),
        };
        total_ms += val * scale;
    }

    if !num.is_empty() {
        let val: f64 = num.parse().map_err(|_| invalid("bad number".to_string()))?;
        total_ms += val * 1_000.0;
    }

    if total_ms == 0.0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_millis(total_ms.round() as u64)))
}
