//! Outbound notifications and user confirmations for the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info};
use tunnelkit_core::{DownloadTarget, TunnelEvent, TunnelEventEmitter, TunnelReason};

use crate::error::{TunnelError, TunnelResult};
use crate::prompt::{PromptRequest, TunnelPrompt};

/// Emits tunnel events and asks the user the registry's questions.
///
/// The security acknowledgement is remembered for the bridge's lifetime, so
/// the warning is shown at most once per registry. A declined warning is
/// not remembered.
pub struct NotificationBridge {
    emitter: Arc<dyn TunnelEventEmitter>,
    prompt: Arc<dyn TunnelPrompt>,
    security_acknowledged: AtomicBool,
    // Concurrent manual requests share one warning
    security_gate: Mutex<()>,
}

impl NotificationBridge {
    pub fn new(emitter: Arc<dyn TunnelEventEmitter>, prompt: Arc<dyn TunnelPrompt>) -> Self {
        Self {
            emitter,
            prompt,
            security_acknowledged: AtomicBool::new(false),
            security_gate: Mutex::new(()),
        }
    }

    pub fn security_acknowledged(&self) -> bool {
        self.security_acknowledged.load(Ordering::Acquire)
    }

    /// Show the public-exposure warning unless already acknowledged.
    pub async fn confirm_security(&self, port: u16) -> TunnelResult<bool> {
        if self.security_acknowledged() {
            return Ok(true);
        }
        let _gate = self.security_gate.lock().await;
        if self.security_acknowledged() {
            return Ok(true);
        }
        let accepted = self
            .prompt
            .confirm(PromptRequest::SecurityWarning { port })
            .await?;
        if accepted {
            self.security_acknowledged.store(true, Ordering::Release);
        }
        Ok(accepted)
    }

    /// Ask for consent to download the tunnel client.
    pub async fn confirm_download(&self, target: &DownloadTarget) -> TunnelResult<bool> {
        self.prompt
            .confirm(PromptRequest::DownloadConsent {
                target: target.clone(),
            })
            .await
    }

    pub fn tunnel_created(&self, port: u16, url: &str, is_auto_created: bool) {
        info!(port = %port, url = %url, is_auto_created, "Tunnel ready");
        self.emitter
            .emit(TunnelEvent::created(port, url, is_auto_created));
    }

    pub fn tunnel_stopped(&self, port: u16, reason: TunnelReason) {
        info!(port = %port, %reason, "Tunnel stopped");
        self.emitter.emit(TunnelEvent::stopped(port, reason));
    }

    pub fn creation_failed(&self, port: u16, reason: TunnelReason) {
        info!(port = %port, %reason, "Tunnel creation did not proceed");
        self.emitter
            .emit(TunnelEvent::creation_failed(port, reason));
    }

    /// Log a failed request and show it to the user once.
    ///
    /// Cancellations are informational and not shown as warnings.
    pub fn surface_failure(&self, port: u16, err: &TunnelError) {
        if err.is_cancellation() {
            info!(port = %port, "Tunnel request cancelled: {err}");
            return;
        }
        error!(port = %port, error = %err, "Tunnel request failed");
        self.prompt
            .warn(&format!("Tunnel for port {port} failed: {err}"));
    }
}

impl std::fmt::Debug for NotificationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBridge")
            .field("security_acknowledged", &self.security_acknowledged())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::MockTunnelPrompt;
    use std::sync::Mutex as StdMutex;

    #[derive(Default, Clone)]
    struct RecordingEmitter {
        events: Arc<StdMutex<Vec<TunnelEvent>>>,
    }

    impl TunnelEventEmitter for RecordingEmitter {
        fn emit(&self, event: TunnelEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn clone_box(&self) -> Box<dyn TunnelEventEmitter> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn security_warning_is_shown_once_after_acceptance() {
        let mut prompt = MockTunnelPrompt::new();
        prompt
            .expect_confirm()
            .withf(|req| matches!(req, PromptRequest::SecurityWarning { port: 8080 }))
            .times(1)
            .returning(|_| Ok(true));

        let bridge = NotificationBridge::new(Arc::new(RecordingEmitter::default()), Arc::new(prompt));
        assert!(bridge.confirm_security(8080).await.unwrap());
        assert!(bridge.confirm_security(9090).await.unwrap());
        assert!(bridge.security_acknowledged());
    }

    #[tokio::test]
    async fn declined_warning_asks_again() {
        let mut prompt = MockTunnelPrompt::new();
        prompt.expect_confirm().times(2).returning(|_| Ok(false));

        let bridge = NotificationBridge::new(Arc::new(RecordingEmitter::default()), Arc::new(prompt));
        assert!(!bridge.confirm_security(8080).await.unwrap());
        assert!(!bridge.confirm_security(8080).await.unwrap());
        assert!(!bridge.security_acknowledged());
    }

    #[test]
    fn notifications_reach_emitter() {
        let emitter = RecordingEmitter::default();
        let bridge = NotificationBridge::new(Arc::new(emitter.clone()), Arc::new(MockTunnelPrompt::new()));
        bridge.tunnel_created(8080, "https://a.trycloudflare.com", true);
        bridge.tunnel_stopped(8080, TunnelReason::ManualStop);
        bridge.creation_failed(9090, TunnelReason::SecurityWarningCancelled);

        let events = emitter.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TunnelEvent::created(8080, "https://a.trycloudflare.com", true),
                TunnelEvent::stopped(8080, TunnelReason::ManualStop),
                TunnelEvent::creation_failed(9090, TunnelReason::SecurityWarningCancelled),
            ]
        );
    }

    #[test]
    fn failures_warn_but_cancellations_do_not() {
        let mut prompt = MockTunnelPrompt::new();
        prompt.expect_warn().times(1).return_const(());
        let bridge = NotificationBridge::new(Arc::new(RecordingEmitter::default()), Arc::new(prompt));

        bridge.surface_failure(80, &TunnelError::Process("boom".into()));
        bridge.surface_failure(
            80,
            &TunnelError::Provisioning(crate::error::ProvisionError::Cancelled {
                stage: crate::progress::ProvisionStage::Downloading,
            }),
        );
    }
}
