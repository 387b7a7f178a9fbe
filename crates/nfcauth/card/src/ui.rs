//! Notifications from the protocol engine to whoever drives the human-facing
//! flows.
//!
//! Every call is fire-and-forget: the engine never waits on the outcome and
//! learns about it later through the shared state slots.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, trace};

/// Receiver of engine notifications
pub trait UiNotifier: Send + Sync + fmt::Debug {
    /// Ask the user to confirm a registration with this reader
    fn start_registration_confirmation(&self, reader_id: &str, reader_name: &str);

    /// Ask the user for a biometric confirmation
    fn start_biometric_prompt(&self);

    /// Tell the user the reader does not know them
    fn notify_not_registered(&self);

    /// Short haptic pulse
    fn haptic_feedback(&self);
}

/// A notification, as published by [`ChannelNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// See [`UiNotifier::start_registration_confirmation`]
    RegistrationConfirmation {
        /// Reader asking to register
        reader_id: String,
        /// Its display name
        reader_name: String,
    },
    /// See [`UiNotifier::start_biometric_prompt`]
    BiometricPrompt,
    /// See [`UiNotifier::notify_not_registered`]
    NotRegistered,
    /// See [`UiNotifier::haptic_feedback`]
    Haptic,
}

/// Publishes notifications as [`UiEvent`]s on a bounded channel
///
/// Events that do not fit are dropped; the reader keeps polling, so a
/// confirmation request that was lost is asked for again.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<UiEvent>,
}

impl ChannelNotifier {
    /// Events buffered for a slow receiver
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a notifier and the receiving end of its events
    pub fn new() -> (Self, Receiver<UiEvent>) {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a notifier buffering at most `capacity` undelivered events
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<UiEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    fn publish(&self, event: UiEvent) {
        trace!(?event, "Publishing UI event");
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => debug!(?event, "UI event dropped, receiver is behind"),
            Err(TrySendError::Disconnected(_)) => debug!("UI event dropped, no receiver"),
        }
    }
}

impl UiNotifier for ChannelNotifier {
    fn start_registration_confirmation(&self, reader_id: &str, reader_name: &str) {
        self.publish(UiEvent::RegistrationConfirmation {
            reader_id: reader_id.to_string(),
            reader_name: reader_name.to_string(),
        });
    }

    fn start_biometric_prompt(&self) {
        self.publish(UiEvent::BiometricPrompt);
    }

    fn notify_not_registered(&self) {
        self.publish(UiEvent::NotRegistered);
    }

    fn haptic_feedback(&self) {
        self.publish(UiEvent::Haptic);
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl UiNotifier for NoopNotifier {
    fn start_registration_confirmation(&self, _reader_id: &str, _reader_name: &str) {}
    fn start_biometric_prompt(&self) {}
    fn notify_not_registered(&self) {}
    fn haptic_feedback(&self) {}
}
