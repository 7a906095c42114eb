//! Tunnel registry: one supervised tunnel per local port.
//!
//! The registry is constructed explicitly by the host and shut down with
//! [`TunnelRegistry::cleanup`]. Clones share the same state.
//!
//! # Creation
//!
//! ```text
//! Requested → (SecurityConfirmed) → Provisioning → Starting → AwaitingUrl → Ready
//! ```
//!
//! While a port is between `Requested` and `Starting`, or while its previous
//! client is still being stopped, it is in flight and a second request for
//! it fails with `CreationInProgress`. Provisioning is
//! serialised across ports so two requests never download the binary at
//! the same time.
//!
//! Each session's events are consumed by a per-instance task. Instance ids
//! make events from an already replaced or stopped instance harmless.

mod config;
mod state;

pub use config::{RegistryConfig, RegistryDeps};

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tunnelkit_core::{
    TunnelOutputSink, TunnelReason, TunnelSnapshot, TunnelState, validate_port,
};

use crate::bridge::NotificationBridge;
use crate::error::{TunnelError, TunnelResult};
use crate::progress::ProgressReporter;
use crate::provision::BinaryProvisioner;
use crate::session::{ProcessSession, SessionConfig, SessionEvent};
use crate::url::UrlExtractor;
use state::{InFlightGuard, SharedState, TunnelInstance};

/// Result of a `create_tunnel` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new tunnel reported its URL.
    Ready(String),
    /// A tunnel with a URL already existed for the port; nothing was spawned.
    Reused(String),
    /// The tunnel is running but no URL appeared within the timeout.
    ///
    /// The tunnel stays registered and may still pick up a URL later.
    Pending,
    /// The tunnel stopped before reporting a URL.
    Stopped,
    /// The user declined a prompt; nothing was spawned.
    Declined(TunnelReason),
}

impl CreateOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Ready(url) | Self::Reused(url) => Some(url),
            _ => None,
        }
    }
}

/// How the first phase of `create_tunnel` resolved.
enum Admission {
    Reused(String),
    /// An instance exists without URL; wait for it.
    Attached(oneshot::Receiver<String>),
    /// Fresh creation; the port is now in flight.
    Fresh(oneshot::Receiver<String>),
}

/// Why `launch` did not register an instance.
enum LaunchAbort {
    Declined(TunnelReason),
    Failed(TunnelError),
}

struct RegistryInner {
    config: RegistryConfig,
    provisioner: BinaryProvisioner,
    bridge: NotificationBridge,
    sink: Arc<dyn TunnelOutputSink>,
    progress: Arc<dyn ProgressReporter>,
    extractor: UrlExtractor,
    state: SharedState,
    /// Serialises check → consent → download across ports.
    provision_lock: Mutex<()>,
    /// Cancels downloads on `cleanup`.
    shutdown: CancellationToken,
    next_instance_id: AtomicU64,
}

/// Registry of active tunnels.
#[derive(Clone)]
pub struct TunnelRegistry {
    inner: Arc<RegistryInner>,
}

impl TunnelRegistry {
    /// Create a registry.
    ///
    /// Fails only if `config.tunnel_domain` cannot form a URL pattern.
    pub fn new(config: RegistryConfig, deps: RegistryDeps) -> TunnelResult<Self> {
        let extractor = UrlExtractor::for_domain(&config.tunnel_domain)?;
        let provisioner = BinaryProvisioner::new(config.binary.clone());
        Ok(Self {
            inner: Arc::new(RegistryInner {
                config,
                provisioner,
                bridge: NotificationBridge::new(deps.emitter, deps.prompt),
                sink: deps.sink,
                progress: deps.progress,
                extractor,
                state: SharedState::default(),
                provision_lock: Mutex::new(()),
                shutdown: CancellationToken::new(),
                next_instance_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn provisioner(&self) -> &BinaryProvisioner {
        &self.inner.provisioner
    }

    /// Expose `port` publicly and wait for its URL.
    ///
    /// Manual requests (`is_auto_created == false`) show the security
    /// warning once per registry. A missing binary is downloaded after
    /// consent. Declined prompts resolve to `CreateOutcome::Declined` with a
    /// `TunnelCreationFailed` event; provisioning and spawn failures are
    /// surfaced to the user and returned as errors. Port 0 is rejected with
    /// `InvalidPort` before anything else happens.
    pub async fn create_tunnel(
        &self,
        port: u16,
        is_auto_created: bool,
    ) -> TunnelResult<CreateOutcome> {
        let port = validate_port(u32::from(port))?;
        let rx = match self.admit(port)? {
            Admission::Reused(url) => {
                debug!(port = %port, url = %url, "Reusing ready tunnel");
                return Ok(CreateOutcome::Reused(url));
            }
            Admission::Attached(rx) => {
                debug!(port = %port, "Waiting on existing tunnel for its URL");
                return Ok(self.wait_for_url(port, rx).await);
            }
            Admission::Fresh(rx) => rx,
        };

        let mut guard = InFlightGuard::new(&self.inner.state, port);
        match self.launch(port, is_auto_created).await {
            Ok(()) => {
                guard.disarm();
                drop(guard);
                Ok(self.wait_for_url(port, rx).await)
            }
            Err(LaunchAbort::Declined(reason)) => Ok(CreateOutcome::Declined(reason)),
            Err(LaunchAbort::Failed(e)) => Err(e),
        }
    }

    fn admit(&self, port: u16) -> TunnelResult<Admission> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(TunnelError::RegistryClosed);
        }
        if let Some(instance) = state.instances.get(&port) {
            if let Some(url) = &instance.url {
                return Ok(Admission::Reused(url.clone()));
            }
            if state.pending.contains_key(&port) {
                return Err(TunnelError::CreationInProgress(port));
            }
            let (tx, rx) = oneshot::channel();
            state.pending.insert(port, tx);
            return Ok(Admission::Attached(rx));
        }
        if state.in_flight.contains_key(&port) {
            return Err(TunnelError::CreationInProgress(port));
        }
        state.in_flight.insert(port, TunnelState::Requested);
        let (tx, rx) = oneshot::channel();
        state.pending.insert(port, tx);
        Ok(Admission::Fresh(rx))
    }

    /// Confirm, provision, spawn, and register.
    async fn launch(&self, port: u16, is_auto_created: bool) -> Result<(), LaunchAbort> {
        let bridge = &self.inner.bridge;

        if !is_auto_created {
            match bridge.confirm_security(port).await {
                Ok(true) => self.set_in_flight(port, TunnelState::SecurityConfirmed),
                Ok(false) => {
                    bridge.creation_failed(port, TunnelReason::SecurityWarningCancelled);
                    return Err(LaunchAbort::Declined(
                        TunnelReason::SecurityWarningCancelled,
                    ));
                }
                Err(e) => {
                    bridge.surface_failure(port, &e);
                    return Err(LaunchAbort::Failed(e));
                }
            }
        }

        self.set_in_flight(port, TunnelState::Provisioning);
        let binary = match self.provision().await {
            Ok(Some(path)) => path,
            Ok(None) => {
                bridge.creation_failed(port, TunnelReason::DownloadCancelled);
                return Err(LaunchAbort::Declined(TunnelReason::DownloadCancelled));
            }
            Err(e) => {
                if matches!(&e, TunnelError::Provisioning(p) if p.is_cancellation()) {
                    bridge.creation_failed(port, TunnelReason::DownloadCancelled);
                }
                bridge.surface_failure(port, &e);
                return Err(LaunchAbort::Failed(e));
            }
        };

        self.set_in_flight(port, TunnelState::Starting);
        let config = SessionConfig {
            binary,
            port,
            working_dir: self.inner.config.working_dir.clone(),
            grace_period: self.inner.config.grace_period,
        };
        let opened =
            ProcessSession::open(&config, Arc::clone(&self.inner.sink), &self.inner.extractor);
        let (session, events) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                bridge.tunnel_stopped(port, TunnelReason::ProcessError);
                bridge.surface_failure(port, &e);
                return Err(LaunchAbort::Failed(e));
            }
        };

        let id = self.inner.next_instance_id.fetch_add(1, Ordering::Relaxed);
        let rejected = {
            let mut state = self.inner.state.lock();
            if state.closed {
                Some(session)
            } else {
                state.in_flight.remove(&port);
                state.instances.insert(
                    port,
                    TunnelInstance {
                        id,
                        port,
                        url: None,
                        is_auto_created,
                        state: TunnelState::AwaitingUrl,
                        session,
                    },
                );
                None
            }
        };
        if let Some(mut session) = rejected {
            // cleanup() ran while this request was starting
            session.kill().await;
            return Err(LaunchAbort::Failed(TunnelError::RegistryClosed));
        }

        debug!(port = %port, instance = id, "Tunnel registered, awaiting URL");
        spawn_event_consumer(Arc::downgrade(&self.inner), port, id, events);
        Ok(())
    }

    /// Resolve the binary, asking for download consent if needed.
    ///
    /// `Ok(None)` means the user declined the download.
    async fn provision(&self) -> TunnelResult<Option<PathBuf>> {
        let _lock = self.inner.provision_lock.lock().await;
        // cleanup() may have run while this request waited for the lock
        if self.inner.state.lock().closed {
            return Err(TunnelError::RegistryClosed);
        }
        let provisioner = &self.inner.provisioner;

        // Re-checked under the lock: a concurrent request may have just installed it
        if let Some(path) = provisioner.check_availability().path {
            return Ok(Some(path));
        }

        let target = provisioner.current_target()?;
        if !self.inner.bridge.confirm_download(&target).await? {
            return Ok(None);
        }

        let cancel = self.inner.shutdown.child_token();
        let path = provisioner
            .download_current(&cancel, self.inner.progress.as_ref())
            .await?;
        Ok(Some(path))
    }

    fn set_in_flight(&self, port: u16, next: TunnelState) {
        self.inner.state.lock().set_in_flight(port, next);
    }

    async fn wait_for_url(&self, port: u16, rx: oneshot::Receiver<String>) -> CreateOutcome {
        match timeout(self.inner.config.url_timeout, rx).await {
            Ok(Ok(url)) => CreateOutcome::Ready(url),
            Ok(Err(_)) => {
                debug!(port = %port, "Tunnel ended before reporting a URL");
                CreateOutcome::Stopped
            }
            Err(_) => {
                let mut state = self.inner.state.lock();
                // Only drop our own (now closed) sender
                if state
                    .pending
                    .get(&port)
                    .is_some_and(oneshot::Sender::is_closed)
                {
                    state.pending.remove(&port);
                }
                info!(
                    port = %port,
                    timeout = ?self.inner.config.url_timeout,
                    "No tunnel URL yet, tunnel stays registered"
                );
                CreateOutcome::Pending
            }
        }
    }

    /// Stop the tunnel for `port` with the grace-period escalation.
    ///
    /// Returns `false` (after a warning) if no tunnel is registered.
    pub async fn stop_tunnel(&self, port: u16) -> bool {
        self.stop_with_reason(port, TunnelReason::ManualStop).await
    }

    /// The user closed the output surface for `port`.
    pub async fn surface_closed(&self, port: u16) -> bool {
        self.stop_with_reason(port, TunnelReason::TerminalClosed).await
    }

    async fn stop_with_reason(&self, port: u16, reason: TunnelReason) -> bool {
        let taken = {
            let mut state = self.inner.state.lock();
            let taken = state.take_instance(port);
            if taken.is_some() {
                state.in_flight.insert(port, TunnelState::Stopping);
            }
            taken
        };
        let Some(mut instance) = taken else {
            warn!(port = %port, "No tunnel registered for port");
            return false;
        };
        // The port stays busy until the old client has been reaped
        let _closing = InFlightGuard::new(&self.inner.state, port);

        instance.transition(TunnelState::Stopping);
        instance.session.close().await;
        instance.transition(TunnelState::Stopped);
        self.inner.bridge.tunnel_stopped(port, reason);
        true
    }

    /// Stop every tunnel one after another. Returns how many were stopped.
    pub async fn stop_all_tunnels(&self) -> usize {
        let mut ports: Vec<u16> = self.inner.state.lock().instances.keys().copied().collect();
        ports.sort_unstable();

        let mut stopped = 0;
        for port in ports {
            if self.stop_tunnel(port).await {
                stopped += 1;
            }
        }
        info!(count = stopped, "Stopped all tunnels");
        stopped
    }

    /// Snapshot of registered tunnels, sorted by port.
    pub fn get_active_tunnels(&self) -> Vec<TunnelSnapshot> {
        let mut snapshots: Vec<_> = self
            .inner
            .state
            .lock()
            .instances
            .values()
            .map(TunnelInstance::snapshot)
            .collect();
        snapshots.sort_by_key(|s| s.port);
        snapshots
    }

    /// Shut the registry down.
    ///
    /// Emits `extension-cleanup` for every tunnel, kills each process with
    /// no grace period, cancels any download, and empties the registry.
    /// Further `create_tunnel` calls fail with `RegistryClosed`.
    pub async fn cleanup(&self) -> usize {
        let mut drained: Vec<(u16, TunnelInstance)> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.pending.clear();
            state.in_flight.clear();
            state.instances.drain().collect()
        };
        self.inner.shutdown.cancel();
        drained.sort_unstable_by_key(|(port, _)| *port);

        let count = drained.len();
        for (port, mut instance) in drained {
            self.inner
                .bridge
                .tunnel_stopped(port, TunnelReason::ExtensionCleanup);
            instance.transition(TunnelState::Stopping);
            instance.session.kill().await;
        }
        info!(count, "Tunnel registry cleaned up");
        count
    }
}

impl std::fmt::Debug for TunnelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelRegistry")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn spawn_event_consumer(
    inner: Weak<RegistryInner>,
    port: u16,
    id: u64,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else { break };
            let terminal = matches!(
                event,
                SessionEvent::Exited { .. } | SessionEvent::Failed(_)
            );
            inner.handle_session_event(port, id, event);
            if terminal {
                break;
            }
        }
    });
}

impl RegistryInner {
    fn handle_session_event(&self, port: u16, id: u64, event: SessionEvent) {
        match event {
            SessionEvent::UrlDiscovered(url) => self.url_discovered(port, id, url),
            SessionEvent::Exited { code } => {
                self.process_ended(port, id, TunnelReason::from_exit_code(code), None);
            }
            SessionEvent::Failed(reason) => {
                self.process_ended(
                    port,
                    id,
                    TunnelReason::ProcessError,
                    Some(TunnelError::Process(reason)),
                );
            }
        }
    }

    fn url_discovered(&self, port: u16, id: u64, url: String) {
        let (waiter, is_auto_created) = {
            let mut state = self.state.lock();
            let Some(instance) = state
                .instances
                .get_mut(&port)
                .filter(|instance| instance.id == id)
            else {
                debug!(port = %port, instance = id, "URL from a stale session ignored");
                return;
            };
            if instance.url.is_some() {
                return;
            }
            instance.url = Some(url.clone());
            instance.transition(TunnelState::Ready);
            let is_auto_created = instance.is_auto_created;
            (state.pending.remove(&port), is_auto_created)
        };

        // A waiter that already timed out gets no event
        if waiter.is_some_and(|tx| tx.send(url.clone()).is_ok()) {
            self.bridge.tunnel_created(port, &url, is_auto_created);
        } else {
            info!(port = %port, url = %url, "Tunnel URL discovered after wait ended");
        }
    }

    fn process_ended(&self, port: u16, id: u64, reason: TunnelReason, error: Option<TunnelError>) {
        let removed = {
            let mut state = self.state.lock();
            let current = state
                .instances
                .get(&port)
                .is_some_and(|instance| instance.id == id);
            if current {
                state.take_instance(port)
            } else {
                None
            }
        };
        let Some(mut instance) = removed else {
            debug!(port = %port, instance = id, "Exit of a stale session ignored");
            return;
        };

        if let Some(e) = error {
            instance.transition(TunnelState::Failed);
            self.bridge.surface_failure(port, &e);
        } else {
            instance.transition(TunnelState::Stopping);
            instance.transition(TunnelState::Stopped);
        }
        self.bridge.tunnel_stopped(port, reason);
    }
}
