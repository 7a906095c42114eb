//! Output readers for the tunnel client's stdout and stderr.
//!
//! The client can emit non-UTF8 bytes, and `BufReader::lines()` stops on
//! invalid UTF-8, so lines are read as bytes and decoded lossily.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tunnelkit_core::TunnelOutputSink;
use tunnelkit_core::ports::normalize_newlines;

use super::SessionEvent;
use crate::url::UrlWatch;

/// Forward every line of `stream` to the sink and the URL watch.
///
/// The task ends at EOF or on a read error.
pub(super) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    port: u16,
    stream_type: &'static str,
    sink: Arc<dyn TunnelOutputSink>,
    watch: Arc<UrlWatch>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let chunk = String::from_utf8_lossy(&buf);
                    let line = chunk.trim_end_matches(['\r', '\n']);
                    debug!(port = %port, %stream_type, "{}", line);

                    sink.write(port, &normalize_newlines(&chunk));
                    if let Some(url) = watch.observe(line) {
                        // Receiver gone means the session is already closing
                        let _ = events.send(SessionEvent::UrlDiscovered(url));
                    }
                }
                Err(e) => {
                    debug!(port = %port, %stream_type, error = %e, "stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(port = %port, %stream_type, "stream reader task exiting");
    })
}
