//! Registry bookkeeping: instances, waiting callers, in-flight ports.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;
use tunnelkit_core::{TunnelSnapshot, TunnelState};

use crate::session::ProcessSession;

/// One registered tunnel with a live (or just exited) process.
#[derive(Debug)]
pub(super) struct TunnelInstance {
    /// Distinguishes this instance from earlier ones on the same port.
    pub id: u64,
    pub port: u16,
    pub url: Option<String>,
    pub is_auto_created: bool,
    pub state: TunnelState,
    pub session: ProcessSession,
}

impl TunnelInstance {
    pub fn transition(&mut self, next: TunnelState) {
        if self.state.can_transition_to(next) {
            debug!(port = %self.port, from = %self.state, to = %next, "Tunnel state transition");
            self.state = next;
        } else {
            debug!(port = %self.port, from = %self.state, to = %next, "Ignoring illegal tunnel state transition");
        }
    }

    pub fn snapshot(&self) -> TunnelSnapshot {
        TunnelSnapshot {
            port: self.port,
            url: self.url.clone(),
            is_auto_created: self.is_auto_created,
            state: self.state,
            pid: self.session.pid(),
            started_at: self.session.started_at(),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct RegistryState {
    pub instances: HashMap<u16, TunnelInstance>,
    /// At most one caller waiting for each port's first URL.
    pub pending: HashMap<u16, oneshot::Sender<String>>,
    /// Ports between `Requested` and `Starting` with no instance yet, or
    /// whose previous client is still shutting down.
    pub in_flight: HashMap<u16, TunnelState>,
    /// Set by `cleanup`; no new tunnels after this.
    pub closed: bool,
}

impl RegistryState {
    pub fn set_in_flight(&mut self, port: u16, state: TunnelState) {
        if let Some(current) = self.in_flight.get_mut(&port) {
            let from = *current;
            debug!(port = %port, %from, to = %state, "Tunnel state transition");
            *current = state;
        }
    }

    /// Remove and return the instance for `port` and its waiting caller.
    pub fn take_instance(&mut self, port: u16) -> Option<TunnelInstance> {
        let instance = self.instances.remove(&port)?;
        self.pending.remove(&port);
        Some(instance)
    }
}

/// Registry state behind a std mutex.
///
/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub(super) struct SharedState(Mutex<RegistryState>);

impl SharedState {
    pub fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a port's in-flight marker and waiting caller unless disarmed.
///
/// Covers declined prompts, failures, a dropped `create_tunnel` future, and
/// the close window of `stop_tunnel`.
pub(super) struct InFlightGuard<'a> {
    state: &'a SharedState,
    port: u16,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    pub const fn new(state: &'a SharedState, port: u16) -> Self {
        Self {
            state,
            port,
            armed: true,
        }
    }

    /// The instance is registered; the waiter stays.
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.in_flight.remove(&self.port);
        if self.armed {
            state.pending.remove(&self.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark_in_flight(shared: &SharedState, port: u16) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let mut state = shared.lock();
        state.in_flight.insert(port, TunnelState::Requested);
        state.pending.insert(port, tx);
        rx
    }

    #[test]
    fn armed_guard_clears_marker_and_waiter() {
        let shared = SharedState::default();
        let mut rx = mark_in_flight(&shared, 8080);

        drop(InFlightGuard::new(&shared, 8080));

        let state = shared.lock();
        assert!(state.in_flight.is_empty());
        assert!(state.pending.is_empty());
        drop(state);
        // Sender dropped with the waiter entry
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disarmed_guard_keeps_waiter() {
        let shared = SharedState::default();
        let _rx = mark_in_flight(&shared, 8080);

        let mut guard = InFlightGuard::new(&shared, 8080);
        guard.disarm();
        drop(guard);

        let state = shared.lock();
        assert!(state.in_flight.is_empty());
        assert!(state.pending.contains_key(&8080));
    }

    #[test]
    fn set_in_flight_only_touches_marked_ports() {
        let shared = SharedState::default();
        let _rx = mark_in_flight(&shared, 3000);

        let mut state = shared.lock();
        state.set_in_flight(3000, TunnelState::Provisioning);
        state.set_in_flight(4000, TunnelState::Provisioning);

        assert_eq!(state.in_flight.get(&3000), Some(&TunnelState::Provisioning));
        assert!(!state.in_flight.contains_key(&4000));
    }
}
