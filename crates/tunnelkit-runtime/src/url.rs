//! Public URL discovery in tunnel-client output.
//!
//! The tunnel client prints its assigned URL as one contiguous token on a
//! single line, so chunks are scanned independently with no buffering
//! across them.

use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;

/// Provider domain quick tunnels are published under.
pub const QUICK_TUNNEL_DOMAIN: &str = "trycloudflare.com";

/// Matches `https://<subdomain>.<provider domain>` in output chunks.
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    pattern: Regex,
}

impl UrlExtractor {
    /// Build an extractor for URLs under `domain`.
    pub fn for_domain(domain: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"https://[A-Za-z0-9][A-Za-z0-9-]*\.{}\b",
            regex::escape(domain)
        ))?;
        Ok(Self { pattern })
    }

    /// Extractor for the default quick-tunnel domain.
    pub fn quick_tunnel() -> Result<Self, regex::Error> {
        Self::for_domain(QUICK_TUNNEL_DOMAIN)
    }

    /// First URL in `chunk`, if any.
    pub fn find<'a>(&self, chunk: &'a str) -> Option<&'a str> {
        self.pattern.find(chunk).map(|m| m.as_str())
    }

    /// Start a first-match latch for one session.
    pub fn watch(&self) -> UrlWatch {
        UrlWatch {
            extractor: self.clone(),
            matched: AtomicBool::new(false),
        }
    }
}

/// Per-session extractor that reports only the first match.
///
/// Shared between the stdout and stderr readers of one process.
#[derive(Debug)]
pub struct UrlWatch {
    extractor: UrlExtractor,
    matched: AtomicBool,
}

impl UrlWatch {
    /// Scan `chunk` and return the URL if it is the first one this session.
    pub fn observe(&self, chunk: &str) -> Option<String> {
        if self.matched.load(Ordering::Acquire) {
            return None;
        }
        let url = self.extractor.find(chunk)?;
        // Only the reader that flips the latch reports
        self.matched
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| url.to_string())
    }

    pub fn has_matched(&self) -> bool {
        self.matched.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_exact_url_from_surrounding_text() {
        let extractor = UrlExtractor::for_domain("tunnel-domain.example").unwrap();
        let chunk = "...https://abcd1234.tunnel-domain.example...";
        assert_eq!(
            extractor.find(chunk),
            Some("https://abcd1234.tunnel-domain.example")
        );
    }

    #[test]
    fn extracts_from_cloudflared_banner() {
        let extractor = UrlExtractor::quick_tunnel().unwrap();
        let line = "2024-01-01T00:00:00Z INF |  https://happy-cat-runs-fast.trycloudflare.com                                 |";
        assert_eq!(
            extractor.find(line),
            Some("https://happy-cat-runs-fast.trycloudflare.com")
        );
    }

    #[test]
    fn ignores_non_matching_output() {
        let extractor = UrlExtractor::quick_tunnel().unwrap();
        assert_eq!(
            extractor.find("Requesting new quick Tunnel on trycloudflare.com..."),
            None
        );
        assert_eq!(extractor.find("http://abcd.trycloudflare.com"), None);
        assert_eq!(extractor.find("https://abcd.trycloudflare.community"), None);
    }

    #[test]
    fn url_split_across_chunks_is_not_detected() {
        let watch = UrlExtractor::quick_tunnel().unwrap().watch();
        assert_eq!(watch.observe("https://abcd"), None);
        assert_eq!(watch.observe("1234.trycloudflare.com"), None);
        assert!(!watch.has_matched());
    }

    #[test]
    fn watch_reports_first_match_only() {
        let watch = UrlExtractor::for_domain("tunnel-domain.example")
            .unwrap()
            .watch();
        let chunk = "...https://abcd1234.tunnel-domain.example...";
        assert_eq!(
            watch.observe(chunk).as_deref(),
            Some("https://abcd1234.tunnel-domain.example")
        );
        assert_eq!(watch.observe(chunk), None);
        assert_eq!(watch.observe("https://other.tunnel-domain.example"), None);
        assert!(watch.has_matched());
    }
}
