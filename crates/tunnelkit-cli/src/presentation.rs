//! Terminal rendering for tunnel output and lifecycle events.

use std::io::Write;

use tunnelkit_core::{TunnelEvent, TunnelOutputSink, TunnelSnapshot};

/// Output surface that prints tunnel-client output prefixed with its port.
///
/// Client output is only echoed when `echo` is set; open/close notices are
/// always shown.
#[derive(Debug, Clone, Copy)]
pub struct TerminalSink {
    echo: bool,
}

impl TerminalSink {
    pub const fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl TunnelOutputSink for TerminalSink {
    fn opened(&self, port: u16) {
        eprintln!("[{port}] tunnel client started");
    }

    fn write(&self, port: u16, text: &str) {
        if !self.echo {
            return;
        }
        let mut err = std::io::stderr().lock();
        for line in prefixed_lines(port, text) {
            let _ = writeln!(err, "{line}");
        }
    }

    fn closed(&self, port: u16) {
        eprintln!("[{port}] tunnel client exited");
    }
}

/// Split normalized output into non-empty `[port] line` strings.
fn prefixed_lines(port: u16, text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| format!("[{port}] {line}"))
        .collect()
}

/// One-line human description of a lifecycle event.
pub fn format_event(event: &TunnelEvent) -> String {
    match event {
        TunnelEvent::TunnelCreated {
            port,
            url,
            is_auto_created,
        } => {
            let origin = if *is_auto_created { " (auto)" } else { "" };
            format!("[{port}] tunnel ready{origin}: {url}")
        }
        TunnelEvent::TunnelStopped { port, reason } => {
            format!("[{port}] tunnel stopped ({reason})")
        }
        TunnelEvent::TunnelCreationFailed { port, reason } => {
            format!("[{port}] tunnel not created ({reason})")
        }
    }
}

/// Table row for `status`-style listings.
pub fn format_snapshot(snapshot: &TunnelSnapshot) -> String {
    let url = snapshot.url.as_deref().unwrap_or("-");
    let pid = snapshot
        .pid
        .map_or_else(|| "-".to_string(), |pid| pid.to_string());
    format!(
        "{:<6} {:<14} {:<8} {}  {}",
        snapshot.port,
        snapshot.state.as_str(),
        pid,
        snapshot.started_at.format("%H:%M:%S"),
        url
    )
}
