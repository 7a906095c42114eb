//! Tunnel-client termination with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::debug;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tokio::time::timeout;

/// How a session should be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Graceful signal, then a forced kill once `grace` has elapsed.
    Graceful { grace: Duration },
    /// Forced kill with no grace period.
    Immediate,
}

/// Terminate `child` according to `mode` and reap it.
///
/// # Platform behavior
/// - Unix: SIGTERM via nix, then SIGKILL via `.kill()` after the grace period
/// - Windows: always kills immediately (no graceful signal available)
pub async fn terminate(child: &mut Child, mode: CloseMode) -> io::Result<ExitStatus> {
    match mode {
        CloseMode::Immediate => kill_now(child).await,
        #[cfg(unix)]
        CloseMode::Graceful { grace } => terminate_unix(child, grace).await,
        #[cfg(not(unix))]
        CloseMode::Graceful { .. } => kill_now(child).await,
    }
}

async fn kill_now(child: &mut Child) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }
    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
async fn terminate_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped
        return child.wait().await;
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    debug!(pid, ?grace, "Grace period elapsed, sending SIGKILL");
    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::process::Command;

    #[tokio::test]
    async fn graceful_stop_for_cooperative_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let started = Instant::now();
        let status = terminate(
            &mut child,
            CloseMode::Graceful {
                grace: Duration::from_secs(5),
            },
        )
        .await
        .unwrap();
        assert!(!status.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; exec sleep 30"])
            .spawn()
            .unwrap();
        // Let the shell install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let grace = Duration::from_millis(300);
        let started = Instant::now();
        let status = terminate(&mut child, CloseMode::Graceful { grace })
            .await
            .unwrap();
        assert!(started.elapsed() >= grace);
        assert!(!status.success());
    }

    #[tokio::test]
    async fn immediate_kill_skips_grace() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; exec sleep 30"])
            .spawn()
            .unwrap();
        let started = Instant::now();
        terminate(&mut child, CloseMode::Immediate).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn already_exited_child_is_reaped() {
        let mut child = Command::new("true").spawn().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = terminate(&mut child, CloseMode::Immediate).await.unwrap();
        assert!(status.success());
    }
}
