//! Local liveness probes.
//!
//! Two independent checks back the local side of liveness detection:
//!
//! - [`ProcessProbe`] - does a pid still exist and is it signalable by us?
//! - [`GroupProbe`]   - is that pid still resident inside the container's cgroup?
//!
//! A confirmed pid is necessary but not sufficient: pids are recycled, so the
//! cgroup path anchors the process to the container's isolation boundary.
//!
//! Both traits are synchronous and cheap; the supervisor calls them inline
//! from its confirmation step and from the local liveness watcher.

mod cgroup;
mod process;

use std::sync::Arc;

pub use cgroup::CgroupFs;
pub use process::SignalProbe;

/// Zero-effect existence probe for a process id.
pub trait ProcessProbe: Send + Sync + 'static {
    /// Returns `false` (never an error) when `pid` is not a live, accessible process.
    fn is_alive(&self, pid: i32) -> bool;
}

/// Membership check of a pid against a cgroup path.
pub trait GroupProbe: Send + Sync + 'static {
    /// Returns `false` when the group cannot be loaded or `pid` escaped it.
    fn is_in_group(&self, pid: i32, group_path: &str) -> bool;
}

/// The pair of probes a supervisor works with.
#[derive(Clone)]
pub struct Probes {
    pub process: Arc<dyn ProcessProbe>,
    pub group: Arc<dyn GroupProbe>,
}

impl Probes {
    pub fn new(process: Arc<dyn ProcessProbe>, group: Arc<dyn GroupProbe>) -> Self {
        Self { process, group }
    }
}

impl Default for Probes {
    /// `kill(pid, 0)` plus the cgroup filesystem under `/sys/fs/cgroup`.
    fn default() -> Self {
        Self {
            process: Arc::new(SignalProbe),
            group: Arc::new(CgroupFs::default()),
        }
    }
}
