//! Container control plane.
//!
//! The supervisor drives exactly four remote operations, expressed by the
//! [`ControlPlane`] trait:
//!
//! | Operation   | Used in state   | Failure policy                  |
//! |-------------|-----------------|---------------------------------|
//! | `inspect`   | Inspecting      | fatal                           |
//! | `start`     | Starting        | fatal                           |
//! | `wait_exit` | Watching        | fatal (never a silent restart)  |
//! | `stop`      | Stopping        | logged, non-fatal               |
//!
//! A fresh handle is obtained through [`Connect`] at the beginning of every
//! supervision attempt and dropped when that attempt ends.
//!
//! ## Contents
//! - [`ContainerSnapshot`], [`ContainerStatus`], [`ExitNotice`] data returned by the plane
//! - [`DockerConnector`], [`DockerOptions`] Docker Engine implementation (bollard)

mod docker;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ControlError;

pub use docker::{DockerConnector, DockerControl, DockerOptions};
pub use snapshot::{ContainerSnapshot, ContainerStatus, ExitNotice};

/// Remote operations on one container.
///
/// Every call is fallible; the caller decides which failures are fatal.
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    /// Returns a fresh snapshot of the container.
    async fn inspect(&self, reference: &str) -> Result<ContainerSnapshot, ControlError>;

    /// Starts the container with the given id.
    async fn start(&self, id: &str) -> Result<(), ControlError>;

    /// Gracefully stops the container; `None` uses the plane's default timeout.
    async fn stop(&self, reference: &str, timeout: Option<Duration>) -> Result<(), ControlError>;

    /// Resolves once, when the container is no longer running.
    ///
    /// Cancel-safe: dropping the future abandons the subscription.
    async fn wait_exit(&self, reference: &str) -> Result<ExitNotice, ControlError>;
}

/// Shared handle to a control plane.
pub type ControlRef = Arc<dyn ControlPlane>;

/// Produces a control-plane handle for one supervision attempt.
pub trait Connect: Send + Sync + 'static {
    fn connect(&self) -> Result<ControlRef, ControlError>;
}
