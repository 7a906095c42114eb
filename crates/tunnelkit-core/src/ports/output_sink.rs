//! Output surface port for tunnel-client output.
//!
//! The lifecycle manager does not own any interactive surface. It writes
//! process output through this port and the presentation layer decides how
//! to show it (terminal pane, log panel, stdout).

/// Port receiving tunnel-client output.
///
/// Implementations should be thread-safe and non-blocking where possible.
pub trait TunnelOutputSink: Send + Sync {
    /// A surface for `port` is being opened.
    fn opened(&self, port: u16);

    /// Append output for `port`.
    ///
    /// `text` is already newline-normalized (`\r\n`).
    fn write(&self, port: u16, text: &str);

    /// The session for `port` has ended.
    fn closed(&self, port: u16);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TunnelOutputSink for NoopSink {
    fn opened(&self, _port: u16) {}
    fn write(&self, _port: u16, _text: &str) {}
    fn closed(&self, _port: u16) {}
}

/// Normalize line endings to `\r\n` for display surfaces.
///
/// Lone `\n` and lone `\r` both become `\r\n`; existing `\r\n` pairs are kept.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_newlines() {
        assert_eq!(normalize_newlines("a\nb\n"), "a\r\nb\r\n");
    }

    #[test]
    fn keeps_crlf_pairs() {
        assert_eq!(normalize_newlines("a\r\nb"), "a\r\nb");
    }

    #[test]
    fn lone_carriage_return_becomes_crlf() {
        assert_eq!(normalize_newlines("a\rb"), "a\r\nb");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_newlines(""), "");
    }
}
