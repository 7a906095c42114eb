//! One supervised tunnel-client process.
//!
//! A session owns the OS process for one port. Its output is read line by
//! line from stdout and stderr, forwarded to the output sink, and scanned
//! for the public URL. Everything the registry needs to react to arrives on
//! the session's event channel:
//!
//! ```text
//! UrlDiscovered(url)   first URL match, at most once
//! Exited { code }      process ended on its own
//! Failed(reason)       waiting on the process failed
//! ```
//!
//! A session closed through `close`/`kill` reports nothing further; the
//! caller already knows why it ended.

mod shutdown;
mod stream;

pub use shutdown::{CloseMode, terminate};

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tunnelkit_core::TunnelOutputSink;

use crate::error::{TunnelError, TunnelResult};
use crate::url::UrlExtractor;
use stream::spawn_stream_reader;

/// How long a naturally exited session waits for its readers to drain.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Something the registry must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// First public URL seen in the output.
    UrlDiscovered(String),
    /// The process exited without being asked to (`None` = killed by a signal).
    Exited { code: Option<i32> },
    /// Supervising the process failed.
    Failed(String),
}

/// Parameters for spawning one tunnel client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub binary: PathBuf,
    pub port: u16,
    /// Neutral directory the process runs in.
    pub working_dir: PathBuf,
    /// Wait between SIGTERM and SIGKILL on `close`.
    pub grace_period: Duration,
}

impl SessionConfig {
    /// Arguments requesting a quick tunnel to the local port.
    pub fn args(&self) -> [String; 3] {
        [
            "tunnel".to_string(),
            "--url".to_string(),
            format!("http://localhost:{}", self.port),
        ]
    }
}

/// Handle to a running tunnel-client process.
///
/// Dropping the handle without closing it kills the process.
#[derive(Debug)]
pub struct ProcessSession {
    port: u16,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    grace_period: Duration,
    close_tx: Option<oneshot::Sender<CloseMode>>,
    supervisor: Option<JoinHandle<()>>,
}

impl ProcessSession {
    /// Spawn the tunnel client and start supervising it.
    ///
    /// Returns the session and the receiver for its events.
    pub fn open(
        config: &SessionConfig,
        sink: Arc<dyn TunnelOutputSink>,
        extractor: &UrlExtractor,
    ) -> TunnelResult<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        let port = config.port;
        sink.opened(port);

        let mut cmd = Command::new(&config.binary);
        cmd.args(config.args())
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(port = %port, binary = %config.binary.display(), "Spawning tunnel client");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                sink.write(port, &format!("Failed to start tunnel client: {e}\r\n"));
                sink.closed(port);
                return Err(TunnelError::Spawn {
                    binary: config.binary.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let pid = child.id();
        info!(port = %port, pid = ?pid, "Tunnel client started");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let watch = Arc::new(extractor.watch());
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stream_reader(
                stdout,
                port,
                "stdout",
                Arc::clone(&sink),
                Arc::clone(&watch),
                events_tx.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stream_reader(
                stderr,
                port,
                "stderr",
                Arc::clone(&sink),
                watch,
                events_tx.clone(),
            ));
        }

        let (close_tx, close_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(
            child, port, readers, close_rx, events_tx, sink,
        ));

        Ok((
            Self {
                port,
                pid,
                started_at: Utc::now(),
                grace_period: config.grace_period,
                close_tx: Some(close_tx),
                supervisor: Some(supervisor),
            },
            events_rx,
        ))
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// SIGTERM, then SIGKILL after the grace period. Returns once reaped.
    pub async fn close(&mut self) {
        let grace = self.grace_period;
        self.shutdown(CloseMode::Graceful { grace }).await;
    }

    /// Kill immediately. Returns once reaped.
    pub async fn kill(&mut self) {
        self.shutdown(CloseMode::Immediate).await;
    }

    async fn shutdown(&mut self, mode: CloseMode) {
        if let Some(tx) = self.close_tx.take() {
            // Err means the process already exited on its own
            let _ = tx.send(mode);
        }
        if let Some(handle) = self.supervisor.take() {
            if let Err(e) = handle.await {
                warn!(port = %self.port, error = %e, "Session supervisor task failed");
            }
        }
    }
}

async fn supervise(
    mut child: Child,
    port: u16,
    readers: Vec<JoinHandle<()>>,
    close_rx: oneshot::Receiver<CloseMode>,
    events: mpsc::UnboundedSender<SessionEvent>,
    sink: Arc<dyn TunnelOutputSink>,
) {
    tokio::select! {
        status = child.wait() => {
            // Let the readers deliver the last lines (and a late URL) first
            if tokio::time::timeout(READER_DRAIN_TIMEOUT, join_all(readers)).await.is_err() {
                debug!(port = %port, "Output readers still open after exit");
            }
            let event = match status {
                Ok(status) => {
                    info!(port = %port, code = ?status.code(), "Tunnel client exited");
                    SessionEvent::Exited { code: status.code() }
                }
                Err(e) => SessionEvent::Failed(e.to_string()),
            };
            let _ = events.send(event);
        }
        mode = close_rx => {
            // A dropped handle counts as an immediate close
            let mode = mode.unwrap_or(CloseMode::Immediate);
            debug!(port = %port, ?mode, "Closing tunnel client");
            match terminate(&mut child, mode).await {
                Ok(status) => debug!(port = %port, code = ?status.code(), "Tunnel client terminated"),
                Err(e) => warn!(port = %port, error = %e, "Failed to terminate tunnel client"),
            }
            for reader in readers {
                reader.abort();
            }
        }
    }
    sink.closed(port);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_request_local_tunnel() {
        let config = SessionConfig {
            binary: PathBuf::from("cloudflared"),
            port: 3000,
            working_dir: PathBuf::from("/"),
            grace_period: Duration::from_secs(5),
        };
        assert_eq!(
            config.args(),
            ["tunnel", "--url", "http://localhost:3000"].map(String::from)
        );
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let config = SessionConfig {
            binary: PathBuf::from("/nonexistent/cloudflared"),
            port: 3000,
            working_dir: std::env::temp_dir(),
            grace_period: Duration::from_secs(5),
        };
        let extractor = UrlExtractor::quick_tunnel().unwrap();
        let result = ProcessSession::open(&config, Arc::new(tunnelkit_core::NoopSink), &extractor);
        assert!(matches!(result, Err(TunnelError::Spawn { .. })));
    }
}
