//! Process existence probe based on `kill(pid, 0)`.

use tracing::debug;

use super::ProcessProbe;

/// Sends the null signal to a pid.
///
/// No signal is delivered; the kernel only performs the existence and
/// permission checks. `EPERM` (exists, but not ours to signal) counts as
/// not alive, as does `ESRCH`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
    fn is_alive(&self, pid: i32) -> bool {
        // 0 and negative pids address process groups
        if pid <= 0 {
            debug!(pid, "refusing to probe non-positive pid");
            return false;
        }
        // SAFETY: signal 0 performs error checking only and has no effect on the target.
        let rc = unsafe { libc::kill(pid, 0) };
        if rc == 0 {
            return true;
        }
        let err = std::io::Error::last_os_error();
        debug!(pid, error = %err, "null signal failed");
        false
    }
}
