//! Time-limited record of a local user confirmation.
//!
//! The biometric flow marks the gate authenticated; the protocol engine reads
//! it when a reader asks for a biometric-gated signature. A read taken more
//! than [`AUTH_TTL`] after the confirmation clears the gate before answering,
//! so a stale confirmation is never honoured.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    clock::{Clock, SystemClock},
    constants::AUTH_TTL,
};

/// Snapshot of the gate state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Whether a confirmation is on record
    pub authenticated: bool,
    /// When the confirmation happened, zero when cleared
    pub last_auth_time: Duration,
    /// Kind of confirmation reported by the prompt, zero when cleared
    pub auth_type: u8,
}

/// Shared authentication flag with lazy TTL expiry
///
/// All fields live behind one lock so an expiry triggered by a read can never
/// interleave with a concurrent [`set_authenticated`](Self::set_authenticated).
#[derive(Debug)]
pub struct AuthGate {
    state: Mutex<AuthState>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AuthGate {
    /// Create a cleared gate reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(AuthState::default()),
            clock,
            ttl: AUTH_TTL,
        }
    }

    /// Record a successful confirmation of the given kind, now
    pub fn set_authenticated(&self, auth_type: u8) {
        let mut state = self.state.lock();
        *state = AuthState {
            authenticated: true,
            last_auth_time: self.clock.now(),
            auth_type,
        };
        debug!(auth_type, "Authentication state set");
    }

    /// Forget any confirmation
    pub fn clear(&self) {
        *self.state.lock() = AuthState::default();
        debug!("Authentication state cleared");
    }

    /// Whether a confirmation younger than the TTL is on record
    ///
    /// Clears the gate as a side effect when the recorded confirmation has
    /// expired.
    pub fn is_authenticated(&self) -> bool {
        let mut state = self.state.lock();
        let elapsed = self.clock.now().saturating_sub(state.last_auth_time);
        if elapsed > self.ttl {
            if state.authenticated {
                debug!(?elapsed, "Authentication expired");
            }
            *state = AuthState::default();
        }
        state.authenticated
    }

    /// Current state, without applying expiry
    pub fn snapshot(&self) -> AuthState {
        *self.state.lock()
    }
}
