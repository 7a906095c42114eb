//! Tunnel creation when the client binary has to be downloaded first.
//!
//! The local server hands out a shell-script "release" so the downloaded
//! binary can actually run. Linux assets are raw executables, so no archive
//! is needed.
#![cfg(target_os = "linux")]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tunnelkit_core::TunnelEvent;
use tunnelkit_runtime::{CreateOutcome, PromptRequest, TunnelPrompt, TunnelResult};

use common::{Harness, TEST_BASE_PORT, TEST_URL, harness_with, url_then_idle};

/// Serve `body` to every request; returns the base URL and a hit counter.
async fn serve_release(body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (format!("http://{addr}"), hits)
}

/// Accepts every prompt and counts download-consent requests.
#[derive(Default)]
struct CountingConsent {
    consents: AtomicUsize,
}

#[async_trait]
impl TunnelPrompt for CountingConsent {
    async fn confirm(&self, request: PromptRequest) -> TunnelResult<bool> {
        if matches!(request, PromptRequest::DownloadConsent { .. }) {
            self.consents.fetch_add(1, Ordering::SeqCst);
        }
        Ok(true)
    }

    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}

/// Registry with no custom binary whose downloads come from `base_url`.
fn downloading_harness(base_url: String, prompt: &Arc<CountingConsent>) -> Harness {
    let prompt = Arc::clone(prompt) as Arc<dyn TunnelPrompt>;
    harness_with(None, Some(prompt), move |mut config| {
        config.binary.download_base_url = base_url;
        config
    })
}

fn release_body() -> Vec<u8> {
    format!("#!/bin/sh\n{}\n", url_then_idle()).into_bytes()
}

#[tokio::test]
async fn accepted_download_installs_binary_and_starts_tunnel() {
    let port = TEST_BASE_PORT + 40;
    let (base_url, hits) = serve_release(release_body()).await;
    let prompt = Arc::new(CountingConsent::default());
    let h = downloading_harness(base_url, &prompt);

    let outcome = h.registry.create_tunnel(port, true).await.unwrap();

    assert_eq!(outcome, CreateOutcome::Ready(TEST_URL.to_string()));
    assert_eq!(prompt.consents.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(h.dir.path().join("bin").join("cloudflared").is_file());
    assert!(
        h.emitter
            .events()
            .contains(&TunnelEvent::created(port, TEST_URL, true))
    );

    // Cached now: no second consent or download
    let outcome = h.registry.create_tunnel(port + 1, true).await.unwrap();
    assert_eq!(outcome.url(), Some(TEST_URL));
    assert_eq!(prompt.consents.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    h.registry.cleanup().await;
}

#[tokio::test]
async fn concurrent_requests_share_one_download() {
    let (a, b) = (TEST_BASE_PORT + 42, TEST_BASE_PORT + 43);
    let (base_url, hits) = serve_release(release_body()).await;
    let prompt = Arc::new(CountingConsent::default());
    let h = downloading_harness(base_url, &prompt);

    let (first, second) = tokio::join!(
        h.registry.create_tunnel(a, true),
        h.registry.create_tunnel(b, true)
    );

    assert_eq!(first.unwrap().url(), Some(TEST_URL));
    assert_eq!(second.unwrap().url(), Some(TEST_URL));
    assert_eq!(prompt.consents.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(h.registry.get_active_tunnels().len(), 2);

    h.registry.cleanup().await;
}
