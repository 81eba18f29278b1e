//! Docker Engine control plane (via bollard).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, StartContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::secret::{ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum};
use bollard::{API_DEFAULT_VERSION, ClientVersion, Docker};
use futures::StreamExt;
use tracing::debug;

use super::{Connect, ContainerSnapshot, ContainerStatus, ControlPlane, ControlRef, ExitNotice};
use crate::error::ControlError;

/// Request timeout of the HTTP client, in seconds.
const CLIENT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// How to reach the Docker daemon.
///
/// Empty fields fall back to the daemon defaults: the local socket and the
/// client's built-in API version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DockerOptions {
    /// `unix:///path`, `tcp://host:port` or `http://host:port`.
    pub host: Option<String>,
    /// API version as `major.minor`, e.g. `1.41`.
    pub api_version: Option<String>,
    /// Directory holding `key.pem`, `cert.pem` and `ca.pem`.
    pub cert_path: Option<PathBuf>,
    /// Use TLS for TCP hosts.
    pub tls_verify: bool,
}

impl DockerOptions {
    fn client_version(&self) -> Result<ClientVersion, ControlError> {
        match self.api_version.as_deref().map(str::trim) {
            None | Some("") => Ok(API_DEFAULT_VERSION.clone()),
            Some(v) => parse_api_version(v),
        }
    }

    fn uses_tls(&self) -> bool {
        self.tls_verify || self.cert_path.is_some()
    }

    fn cert_dir(&self) -> PathBuf {
        match &self.cert_path {
            Some(path) => path.clone(),
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".docker"),
        }
    }

    fn client(&self) -> Result<Docker, ControlError> {
        let version = self.client_version()?;
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty());

        let docker = match host {
            None => Docker::connect_with_unix(DEFAULT_SOCKET, CLIENT_TIMEOUT_SECS, &version),
            Some(h) if h.starts_with("unix://") => {
                Docker::connect_with_unix(&h["unix://".len()..], CLIENT_TIMEOUT_SECS, &version)
            }
            Some(h) if self.uses_tls() => {
                let dir = self.cert_dir();
                Docker::connect_with_ssl(
                    h,
                    &dir.join("key.pem"),
                    &dir.join("cert.pem"),
                    &dir.join("ca.pem"),
                    CLIENT_TIMEOUT_SECS,
                    &version,
                )
            }
            Some(h) => Docker::connect_with_http(h, CLIENT_TIMEOUT_SECS, &version),
        };
        docker.map_err(|e| ControlError::Connection(e.to_string()))
    }
}

/// Connects a new [`DockerControl`] for every supervision attempt.
#[derive(Clone, Debug, Default)]
pub struct DockerConnector {
    options: DockerOptions,
}

impl DockerConnector {
    pub fn new(options: DockerOptions) -> Self {
        Self { options }
    }
}

impl Connect for DockerConnector {
    fn connect(&self) -> Result<ControlRef, ControlError> {
        let docker = self.options.client()?;
        debug!(host = ?self.options.host, "connected docker client");
        Ok(Arc::new(DockerControl { docker }))
    }
}

/// [`ControlPlane`] backed by a bollard [`Docker`] client.
pub struct DockerControl {
    docker: Docker,
}

#[async_trait]
impl ControlPlane for DockerControl {
    async fn inspect(&self, reference: &str) -> Result<ContainerSnapshot, ControlError> {
        let resp = self
            .docker
            .inspect_container(reference, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_error(reference, e))?;
        snapshot_from(resp)
    }

    async fn start(&self, id: &str) -> Result<(), ControlError> {
        match self
            .docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already started
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_error(id, e)),
        }
    }

    async fn stop(&self, reference: &str, timeout: Option<Duration>) -> Result<(), ControlError> {
        let options = timeout.map(|t| StopContainerOptions {
            t: grace_seconds(t),
        });
        match self.docker.stop_container(reference, options).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_error(reference, e)),
        }
    }

    async fn wait_exit(&self, reference: &str) -> Result<ExitNotice, ControlError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut waits = self.docker.wait_container(reference, Some(options));

        match waits.next().await {
            Some(Ok(resp)) => match resp.error.and_then(|e| e.message) {
                Some(message) if !message.is_empty() => Err(ControlError::Request(message)),
                _ => Ok(ExitNotice {
                    exit_code: resp.status_code,
                }),
            },
            // bollard reports non-zero exit codes as errors
            Some(Err(BollardError::DockerContainerWaitError { error, code })) if error.is_empty() => {
                Ok(ExitNotice { exit_code: code })
            }
            Some(Err(e)) => Err(map_error(reference, e)),
            None => Err(ControlError::Malformed(
                "wait stream ended without a result".to_string(),
            )),
        }
    }
}

/// Whole seconds for the engine's `t` parameter, rounded up so a sub-second
/// timeout never becomes an immediate kill.
fn grace_seconds(timeout: Duration) -> i64 {
    let secs = timeout
        .as_secs()
        .saturating_add(u64::from(timeout.subsec_nanos() > 0));
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn map_error(reference: &str, err: BollardError) -> ControlError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => ControlError::NotFound(reference.to_string()),
        other => ControlError::Request(other.to_string()),
    }
}

fn parse_api_version(input: &str) -> Result<ClientVersion, ControlError> {
    let invalid = || ControlError::Connection(format!("invalid API version {input:?}"));
    let (major, minor) = input
        .trim_start_matches('v')
        .split_once('.')
        .ok_or_else(invalid)?;
    Ok(ClientVersion {
        major_version: major.parse().map_err(|_| invalid())?,
        minor_version: minor.parse().map_err(|_| invalid())?,
    })
}

fn snapshot_from(resp: ContainerInspectResponse) -> Result<ContainerSnapshot, ControlError> {
    let id = resp
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ControlError::Malformed("inspect returned no container id".to_string()))?;
    let state = resp.state.unwrap_or_default();

    let status = match state.status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    };
    let health = state
        .health
        .and_then(|h| h.status)
        .filter(|s| !matches!(s, HealthStatusEnum::EMPTY | HealthStatusEnum::NONE))
        .map(|s| s.to_string());

    Ok(ContainerSnapshot {
        id,
        name: resp.name.unwrap_or_default(),
        status,
        pid: state.pid.and_then(|p| i32::try_from(p).ok()).unwrap_or(0),
        health,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::secret::{ContainerState, Health};

    fn inspect_response(status: ContainerStateStatusEnum, pid: i64) -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some("0123abcd".into()),
            name: Some("/web-1".into()),
            state: Some(ContainerState {
                status: Some(status),
                pid: Some(pid),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn stop_timeout_rounds_up_to_whole_seconds() {
        assert_eq!(grace_seconds(Duration::ZERO), 0);
        assert_eq!(grace_seconds(Duration::from_millis(500)), 1);
        assert_eq!(grace_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(grace_seconds(Duration::from_secs(30)), 30);
        assert_eq!(grace_seconds(Duration::MAX), i64::MAX);
    }

    #[test]
    fn snapshot_maps_running_state() {
        let snap = snapshot_from(inspect_response(ContainerStateStatusEnum::RUNNING, 4242)).unwrap();
        assert_eq!(snap.id, "0123abcd");
        assert_eq!(snap.name, "/web-1");
        assert_eq!(snap.status, ContainerStatus::Running);
        assert_eq!(snap.pid, 4242);
        assert_eq!(snap.health, None);
    }

    #[test]
    fn snapshot_keeps_reported_health() {
        let mut resp = inspect_response(ContainerStateStatusEnum::RUNNING, 7);
        if let Some(state) = resp.state.as_mut() {
            state.health = Some(Health {
                status: Some(HealthStatusEnum::HEALTHY),
                ..Default::default()
            });
        }
        let snap = snapshot_from(resp).unwrap();
        assert_eq!(snap.status_line(), "running [healthy]");
    }

    #[test]
    fn snapshot_without_id_is_malformed() {
        let resp = ContainerInspectResponse::default();
        assert!(matches!(snapshot_from(resp), Err(ControlError::Malformed(_))));
    }

    #[test]
    fn exited_container_reports_zero_pid() {
        let snap = snapshot_from(inspect_response(ContainerStateStatusEnum::EXITED, 0)).unwrap();
        assert_eq!(snap.status, ContainerStatus::Exited);
        assert_eq!(snap.pid, 0);
    }

    #[test]
    fn api_version_parsing() {
        let v = parse_api_version("1.41").unwrap();
        assert_eq!((v.major_version, v.minor_version), (1, 41));
        assert!(parse_api_version("141").is_err());
        assert!(parse_api_version("one.two").is_err());
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = map_error(
            "web-1",
            BollardError::DockerResponseServerError {
                status_code: 404,
                message: "No such container: web-1".into(),
            },
        );
        assert_eq!(err, ControlError::NotFound("web-1".into()));
    }
}
