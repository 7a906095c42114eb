//! Shared fixtures for tunnel registry integration tests.
//!
//! Tunnel clients are faked with small shell scripts installed through the
//! custom binary path, so these helpers are Unix-only.

// Each test binary uses a different subset
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tunnelkit_core::{TunnelEvent, TunnelEventEmitter, TunnelOutputSink};
use tunnelkit_runtime::{
    BinaryOptions, RegistryConfig, RegistryDeps, TunnelPrompt, TunnelRegistry,
};

/// URL printed by the fake clients.
pub const TEST_URL: &str = "https://abcd1234.trycloudflare.com";

/// Base port for registry tests; each test adds its own offset.
pub const TEST_BASE_PORT: u16 = 19100;

/// Prints the URL banner on stderr like the real client, then idles.
pub fn url_then_idle() -> String {
    format!("echo 'starting tunnel'\necho 'INF |  {TEST_URL}  |' >&2\nexec sleep 30")
}

/// Write an executable `/bin/sh` script.
pub fn fake_client(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-cloudflared");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Default, Clone)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<TunnelEvent>>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<TunnelEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TunnelEventEmitter for RecordingEmitter {
    fn emit(&self, event: TunnelEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn TunnelEventEmitter> {
        Box::new(self.clone())
    }
}

#[derive(Default, Clone)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl TunnelOutputSink for RecordingSink {
    fn opened(&self, port: u16) {
        self.log.lock().unwrap().push(format!("opened:{port}"));
    }

    fn write(&self, port: u16, text: &str) {
        self.log.lock().unwrap().push(format!("write:{port}:{text}"));
    }

    fn closed(&self, port: u16) {
        self.log.lock().unwrap().push(format!("closed:{port}"));
    }
}

pub struct Harness {
    pub registry: TunnelRegistry,
    pub emitter: RecordingEmitter,
    pub sink: RecordingSink,
    pub dir: TempDir,
}

/// Registry with a fake client, 300ms grace period, 5s URL timeout.
pub fn harness(script: Option<&str>, prompt: Option<Arc<dyn TunnelPrompt>>) -> Harness {
    harness_with(script, prompt, |config| config)
}

pub fn harness_with(
    script: Option<&str>,
    prompt: Option<Arc<dyn TunnelPrompt>>,
    tweak: impl FnOnce(RegistryConfig) -> RegistryConfig,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let custom_path = script.map(|body| fake_client(dir.path(), body));
    let binary = BinaryOptions {
        custom_path,
        ..BinaryOptions::in_data_root(dir.path())
    };
    let config = RegistryConfig::new(binary, dir.path().to_path_buf())
        .with_grace_period(Duration::from_millis(300))
        .with_url_timeout(Duration::from_secs(5));

    let emitter = RecordingEmitter::default();
    let sink = RecordingSink::default();
    let mut deps = RegistryDeps::default()
        .with_emitter(Arc::new(emitter.clone()))
        .with_sink(Arc::new(sink.clone()));
    if let Some(prompt) = prompt {
        deps = deps.with_prompt(prompt);
    }

    let registry = TunnelRegistry::new(tweak(config), deps).unwrap();
    Harness {
        registry,
        emitter,
        sink,
        dir,
    }
}

/// Whether a process with `pid` still exists.
pub fn process_alive(pid: u32) -> bool {
    let pid = nix::unistd::Pid::from_raw(i32::try_from(pid).unwrap());
    nix::sys::signal::kill(pid, None).is_ok()
}

/// Poll `cond` for up to five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
