//! # Cgroup membership check over the cgroup filesystem.
//!
//! Loads a cgroup by path under every hierarchy mounted below the root
//! and enumerates its member processes recursively.
//!
//! ## Layouts
//! ```text
//! v1 (one hierarchy per controller):      v2 (unified):
//!   /sys/fs/cgroup/cpu/docker/<id>/         /sys/fs/cgroup/cgroup.controllers
//!   /sys/fs/cgroup/memory/docker/<id>/      /sys/fs/cgroup/system.slice/docker-<id>.scope/
//! ```
//!
//! ## Rules
//! - A group with no present controller is treated as torn down → not contained.
//! - A member whose pid matches must reside exactly in the group (path suffix match);
//!   found deeper or elsewhere means it escaped or was recycled → not contained.
//! - If the pid is not listed at all, the group still stands → contained.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::GroupProbe;

const DEFAULT_ROOT: &str = "/sys/fs/cgroup";
const PROCS_FILE: &str = "cgroup.procs";
const UNIFIED_MARKER: &str = "cgroup.controllers";

/// A process listed in a cgroup, with the directory it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Member {
    pid: i32,
    /// Path relative to its hierarchy, `/`-prefixed and `/`-terminated.
    path: String,
}

/// One hierarchy that contains the requested group.
#[derive(Debug)]
struct Controller {
    hierarchy: PathBuf,
    group_dir: PathBuf,
}

/// [`GroupProbe`] reading `cgroup.procs` files below a cgroup mount root.
#[derive(Clone, Debug)]
pub struct CgroupFs {
    root: PathBuf,
}

impl Default for CgroupFs {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl CgroupFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mounted hierarchies: the root itself on v2, its subdirectories on v1.
    fn hierarchies(&self) -> Vec<PathBuf> {
        if self.root.join(UNIFIED_MARKER).is_file() {
            return vec![self.root.clone()];
        }
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(root = %self.root.display(), error = %err, "cannot list cgroup root");
                return Vec::new();
            }
        };
        // symlinked aliases (cpu -> cpu,cpuacct) are skipped, not double counted
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        dirs.sort();
        dirs
    }

    fn load(&self, group_path: &str) -> Vec<Controller> {
        let relative = group_path.trim_matches('/');
        self.hierarchies()
            .into_iter()
            .filter_map(|hierarchy| {
                let group_dir = hierarchy.join(relative);
                group_dir.is_dir().then_some(Controller {
                    hierarchy,
                    group_dir,
                })
            })
            .collect()
    }

    fn members(controller: &Controller) -> Vec<Member> {
        let mut members = Vec::new();
        for entry in WalkDir::new(&controller.group_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
        {
            let procs = entry.path().join(PROCS_FILE);
            let content = match fs::read_to_string(&procs) {
                Ok(content) => content,
                Err(err) => {
                    debug!(path = %procs.display(), error = %err, "skipping unreadable cgroup.procs");
                    continue;
                }
            };
            let Some(path) = resident_path(&controller.hierarchy, entry.path()) else {
                continue;
            };
            members.extend(
                content
                    .lines()
                    .filter_map(|line| line.trim().parse::<i32>().ok())
                    .map(|pid| Member {
                        pid,
                        path: path.clone(),
                    }),
            );
        }
        members
    }
}

impl GroupProbe for CgroupFs {
    fn is_in_group(&self, pid: i32, group_path: &str) -> bool {
        let controllers = self.load(group_path);
        if controllers.is_empty() {
            debug!(pid, group = group_path, "cgroup not loadable");
            return false;
        }

        let expected = normalize(group_path);
        for controller in &controllers {
            let escaped = Self::members(controller)
                .into_iter()
                .find(|m| m.pid == pid && !m.path.ends_with(&expected));
            if let Some(member) = escaped {
                debug!(
                    pid,
                    group = %expected,
                    found = %member.path,
                    hierarchy = %controller.hierarchy.display(),
                    "pid resides outside its cgroup"
                );
                return false;
            }
        }
        true
    }
}

fn normalize(group_path: &str) -> String {
    let trimmed = group_path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

fn resident_path(hierarchy: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(hierarchy).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(normalize(&joined))
}
