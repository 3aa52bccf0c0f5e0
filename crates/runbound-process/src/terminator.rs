//! Process tree termination
//!
//! Best-effort, cross-platform teardown of a child and every descendant it
//! spawned. The trait method returns nothing: a failed kill is logged and
//! swallowed, and the child's own exit status is the only observable result.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// SIGKILL escalation timeout (200ms)
const SIGKILL_TIMEOUT_MS: u64 = 200;

/// Terminates a process and all of its descendants
///
/// Implementations must resolve even when the process is already gone or
/// the platform offers no way to signal it.
#[async_trait]
pub trait TreeTerminator: Send + Sync {
    async fn kill_tree(&self, pid: u32);
}

/// Default terminator
///
/// - Windows: `taskkill /pid <pid> /f /t`
/// - Unix: signals the process group led by `pid` with SIGTERM, then SIGKILL
///   after the escalation delay. Children must be spawned as group leaders
///   (the supervisor does this).
#[derive(Debug, Clone)]
pub struct ProcessTreeTerminator {
    escalation: Duration,
}

impl ProcessTreeTerminator {
    pub fn new() -> Self {
        Self {
            escalation: Duration::from_millis(SIGKILL_TIMEOUT_MS),
        }
    }

    /// Override the delay between SIGTERM and SIGKILL
    pub fn with_escalation(escalation: Duration) -> Self {
        Self { escalation }
    }
}

impl Default for ProcessTreeTerminator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeTerminator for ProcessTreeTerminator {
    async fn kill_tree(&self, pid: u32) {
        if pid == 0 {
            debug!("Ignoring kill request for pid 0");
            return;
        }

        debug!(pid = %pid, "Killing process tree");
        platform_kill_tree(pid, self.escalation).await;
    }
}

#[cfg(unix)]
async fn platform_kill_tree(pid: u32, escalation: Duration) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid = %pid, "Pid out of range, skipping kill");
        return;
    };
    let pgid = Pid::from_raw(raw);

    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => debug!(pid = %pid, "Sent SIGTERM to process group"),
        Err(Errno::ESRCH) => {
            debug!(pid = %pid, "Process group already gone");
            return;
        }
        Err(e) => warn!(pid = %pid, error = %e, "Failed to send SIGTERM to process group"),
    }

    tokio::time::sleep(escalation).await;

    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) => debug!(pid = %pid, "Sent SIGKILL to process group"),
        Err(Errno::ESRCH) => debug!(pid = %pid, "Process group exited after SIGTERM"),
        Err(e) => warn!(pid = %pid, error = %e, "Failed to send SIGKILL to process group"),
    }
}

#[cfg(windows)]
async fn platform_kill_tree(pid: u32, _escalation: Duration) {
    use std::process::Stdio;
    use tokio::process::Command;

    let status = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/f", "/t"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => debug!(pid = %pid, "Windows process tree killed"),
        Ok(status) => debug!(pid = %pid, code = ?status.code(), "taskkill reported failure"),
        Err(e) => warn!(pid = %pid, error = %e, "Failed to run taskkill"),
    }
}

#[cfg(not(any(unix, windows)))]
async fn platform_kill_tree(pid: u32, _escalation: Duration) {
    warn!(pid = %pid, "No process tree termination mechanism on this platform");
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_kill_tree_after_exit_resolves() {
        let mut child = Command::new("true").process_group(0).spawn().unwrap();
        let pid = child.id().unwrap();
        child.wait().await.unwrap();

        let terminator = ProcessTreeTerminator::new();
        terminator.kill_tree(pid).await;
        terminator.kill_tree(pid).await;
    }

    #[tokio::test]
    async fn test_kill_tree_pid_zero_is_noop() {
        ProcessTreeTerminator::new().kill_tree(0).await;
    }

    #[tokio::test]
    async fn test_kill_tree_stops_group() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30 & sleep 30"])
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();

        ProcessTreeTerminator::with_escalation(Duration::from_millis(50))
            .kill_tree(pid)
            .await;

        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child should exit after kill_tree")
            .unwrap();
        assert!(status.signal().is_some());
    }
}
