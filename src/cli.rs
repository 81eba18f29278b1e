//! Command-line surface.
//!
//! Every flag falls back to an environment variable, so a systemd unit can
//! configure the supervisor through `Environment=` lines alone. Resolution
//! happens once, in [`Cli::resolve`], and yields immutable settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::config::{DEFAULT_CGROUP_FORMAT, StopBehavior, SupervisorConfig, parse_duration};
use crate::control::DockerOptions;
use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, JitterPolicy};

/// Keeps one Docker container alive on behalf of systemd.
#[derive(Parser, Debug, Clone)]
#[command(name = "containervisor", version, about)]
pub struct Cli {
    /// Name or id of the container to supervise.
    #[arg(long, env = "CONTAINER", value_name = "NAME")]
    pub container: String,

    /// Start attempts per supervision attempt.
    #[arg(long, env = "START_TRIES", default_value_t = 3)]
    pub start_tries: u32,

    /// Liveness confirmations allowed to fail per supervision attempt.
    #[arg(long, env = "CHECK_TRIES", default_value_t = 3)]
    pub check_tries: u32,

    /// Local liveness poll interval in milliseconds.
    #[arg(long, env = "CHECK_INTERVAL", default_value_t = 500, value_name = "MS")]
    pub check_interval: u64,

    /// Confirm liveness through the entrypoint pid.
    #[arg(long, env = "USE_PID", default_value_t = true, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub use_pid: bool,

    /// Require the pid to live in the container's cgroup.
    #[arg(long, env = "USE_CGROUP", default_value_t = true, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub use_cgroup: bool,

    /// Send state updates over sd_notify.
    #[arg(long, env = "NOTIFY_SD", default_value_t = true, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub notify_sd: bool,

    /// Stop the container on SIGINT (otherwise detach).
    #[arg(long, env = "STOP_ON_SIGINT", default_value_t = false, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub stop_on_sigint: bool,

    /// Stop the container on SIGTERM (otherwise detach).
    #[arg(long, env = "STOP_ON_SIGTERM", default_value_t = true, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub stop_on_sigterm: bool,

    /// Graceful stop timeout (`10s`, `1m30s`, ...); empty uses the daemon default.
    #[arg(long, env = "STOP_TIMEOUT", default_value = "", value_name = "DURATION")]
    pub stop_timeout: String,

    /// Mount point of the cgroup filesystem.
    #[arg(long, env = "CGROUP_ROOT", default_value = "/sys/fs/cgroup", value_name = "DIR")]
    pub cgroup_root: PathBuf,

    /// Cgroup path template of a container; `{id}` is the container id.
    #[arg(long, env = "CGROUP_FORMAT", default_value = DEFAULT_CGROUP_FORMAT, value_name = "TEMPLATE")]
    pub cgroup_format: String,

    /// Delay before the first restart in milliseconds; 0 restarts immediately.
    #[arg(long, env = "RESTART_DELAY", default_value_t = 0, value_name = "MS")]
    pub restart_delay: u64,

    /// Maximum restart delay in milliseconds.
    #[arg(long, env = "RESTART_DELAY_MAX", default_value_t = 30_000, value_name = "MS")]
    pub restart_delay_max: u64,

    /// Docker daemon address (`unix://`, `tcp://` or `http://`).
    #[arg(long, env = "DOCKER_HOST", value_name = "URL")]
    pub docker_host: Option<String>,

    /// Docker API version, e.g. `1.41`.
    #[arg(long, env = "DOCKER_API_VERSION", value_name = "VERSION")]
    pub docker_api_version: Option<String>,

    /// Directory with `key.pem`, `cert.pem` and `ca.pem`.
    #[arg(long, env = "DOCKER_CERT_PATH", value_name = "DIR")]
    pub docker_cert_path: Option<PathBuf>,

    /// Talk TLS to a TCP daemon.
    #[arg(long, env = "DOCKER_TLS_VERIFY", default_value_t = false, action = ArgAction::Set,
          value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub docker_tls_verify: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

/// Settings resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub supervisor: SupervisorConfig,
    pub docker: DockerOptions,
    pub cgroup_root: PathBuf,
    pub log_level: String,
}

impl Cli {
    /// Converts the parsed flags into validated settings.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let supervisor = SupervisorConfig {
            container: self.container.trim().to_string(),
            start_tries: self.start_tries,
            check_tries: self.check_tries,
            check_interval: Duration::from_millis(self.check_interval),
            use_pid: self.use_pid,
            use_cgroup: self.use_cgroup,
            notify_host: self.notify_sd,
            stop: StopBehavior {
                on_interrupt: self.stop_on_sigint,
                on_terminate: self.stop_on_sigterm,
            },
            stop_timeout: parse_duration(&self.stop_timeout)?,
            cgroup_format: self.cgroup_format.clone(),
            restart_backoff: BackoffPolicy {
                first: Duration::from_millis(self.restart_delay),
                max: Duration::from_millis(self.restart_delay_max),
                factor: 2.0,
                jitter: JitterPolicy::Equal,
            },
        };
        supervisor.validate()?;

        let docker = DockerOptions {
            host: non_empty(self.docker_host.as_deref()),
            api_version: non_empty(self.docker_api_version.as_deref()),
            cert_path: self
                .docker_cert_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            tls_verify: self.docker_tls_verify,
        };

        Ok(Settings {
            supervisor,
            docker,
            cgroup_root: self.cgroup_root.clone(),
            log_level: self.log_level.clone(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
