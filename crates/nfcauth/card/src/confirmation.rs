//! The human-paced side of the handshakes.
//!
//! These flows run outside the protocol engine, typically on a UI thread, and
//! report back only through the shared [`PendingRegistrationStore`] and
//! [`AuthGate`].

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, after, select, tick};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    Error, Result,
    auth_gate::AuthGate,
    pending::{PendingRegistration, PendingRegistrationStore},
    signer::SigningService,
};

/// How a registration hand-off ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The reader completed the registration
    Consumed,
    /// Another registration replaced this one in the store
    Superseded,
    /// The reader never completed within the timeout
    TimedOut,
    /// The wait was cancelled
    Cancelled,
}

/// A registration awaiting the user's consent
///
/// Created when the engine asks for a registration confirmation. The user
/// either supplies a display name ([`confirm`](Self::confirm)) or dismisses
/// the flow ([`abandon`](Self::abandon)). After confirming, the flow waits
/// for the reader to collect and complete the registration before telling
/// the user it succeeded.
#[derive(Debug)]
pub struct RegistrationConfirmation {
    store: Arc<dyn PendingRegistrationStore>,
    signer: Arc<dyn SigningService>,
    reader_id: String,
    reader_name: String,
    user_id: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl RegistrationConfirmation {
    /// Default interval between checks of the store
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
    /// Default bound on the wait for the reader
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Start a confirmation for `reader_id`, with a fresh user id
    pub fn new(
        store: Arc<dyn PendingRegistrationStore>,
        signer: Arc<dyn SigningService>,
        reader_id: impl Into<String>,
        reader_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            signer,
            reader_id: reader_id.into(),
            reader_name: reader_name.into(),
            user_id: Uuid::new_v4().to_string(),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the interval between checks of the store
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the bound on the wait for the reader
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reader being registered
    pub fn reader_id(&self) -> &str {
        &self.reader_id
    }

    /// Reader display name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// User id this registration will present to the reader
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Accept the registration under `user_name`, staging the record for
    /// the reader
    pub fn confirm(&self, user_name: &str) -> Result<PendingRegistration> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(Error::InvalidInput("user name must not be blank"));
        }

        let record = PendingRegistration {
            reader_id: self.reader_id.clone(),
            reader_name: self.reader_name.clone(),
            user_id: self.user_id.clone(),
            user_name: user_name.to_string(),
            public_key: self.signer.public_key()?,
        };
        self.store.set(Some(record.clone()))?;
        info!(reader_id = %self.reader_id, user_id = %self.user_id, "Registration confirmed by user");
        Ok(record)
    }

    /// Block until the staged record leaves the store
    ///
    /// Bounded by the timeout and by `cancel`, which fires on a message or on
    /// disconnection. Both of those remove this flow's record from the store.
    pub fn wait_until_consumed(&self, cancel: &Receiver<()>) -> Result<ConfirmationOutcome> {
        let ticker = tick(self.poll_interval);
        let deadline = after(self.timeout);

        loop {
            match self.store.get()? {
                None => {
                    info!(reader_id = %self.reader_id, "Registration collected by reader");
                    return Ok(ConfirmationOutcome::Consumed);
                }
                Some(record) if !self.owns(&record) => {
                    debug!(reader_id = %self.reader_id, "Registration replaced by another");
                    return Ok(ConfirmationOutcome::Superseded);
                }
                Some(_) => {}
            }

            select! {
                recv(ticker) -> _ => {}
                recv(deadline) -> _ => {
                    warn!(reader_id = %self.reader_id, timeout = ?self.timeout, "Reader did not complete registration");
                    self.clear_own()?;
                    return Ok(ConfirmationOutcome::TimedOut);
                }
                recv(cancel) -> _ => {
                    debug!(reader_id = %self.reader_id, "Registration wait cancelled");
                    self.clear_own()?;
                    return Ok(ConfirmationOutcome::Cancelled);
                }
            }
        }
    }

    /// The user dismissed the flow
    pub fn abandon(&self) -> Result<()> {
        debug!(reader_id = %self.reader_id, "Registration abandoned");
        self.clear_own()
    }

    fn owns(&self, record: &PendingRegistration) -> bool {
        record.reader_id == self.reader_id && record.user_id == self.user_id
    }

    fn clear_own(&self) -> Result<()> {
        match self.store.get()? {
            Some(record) if self.owns(&record) => self.store.clear(),
            _ => Ok(()),
        }
    }
}

/// Result delivery for the biometric prompt
#[derive(Debug, Clone)]
pub struct BiometricConfirmation {
    gate: Arc<AuthGate>,
}

impl BiometricConfirmation {
    /// Report prompt results into `gate`
    pub const fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }

    /// The user passed the prompt with a confirmation of kind `auth_type`
    pub fn succeeded(&self, auth_type: u8) {
        info!(auth_type, "Biometric confirmation succeeded");
        self.gate.set_authenticated(auth_type);
    }

    /// The prompt rejected the user
    pub fn failed(&self) {
        warn!("Biometric confirmation failed");
        self.gate.clear();
    }

    /// The user dismissed the prompt
    pub fn cancelled(&self) {
        debug!("Biometric confirmation cancelled");
        self.gate.clear();
    }
}
