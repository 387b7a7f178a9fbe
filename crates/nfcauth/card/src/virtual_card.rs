//! In-process transport to an emulated card.

use bytes::Bytes;
use nfcauth_apdu_core::{CardTransport, TransportError};
use tracing::debug;

use crate::engine::ApduProtocolEngine;

/// A [`CardTransport`] delivering commands straight to an engine
///
/// Stands in for the contactless link. Taking the card out of the field
/// ([`remove`](Self::remove) or [`reset`](CardTransport::reset)) tears the
/// session down the way a lost field does.
#[derive(Debug)]
pub struct VirtualCard {
    engine: ApduProtocolEngine,
    present: bool,
}

impl VirtualCard {
    /// A card already in the field
    pub const fn new(engine: ApduProtocolEngine) -> Self {
        Self {
            engine,
            present: true,
        }
    }

    /// Bring the card back into the field
    pub fn tap(&mut self) {
        debug!("Card entered the field");
        self.present = true;
    }

    /// Take the card out of the field
    pub fn remove(&mut self) {
        if self.present {
            debug!("Card left the field");
            self.engine.deactivate();
            self.present = false;
        }
    }

    /// The emulated card
    pub const fn engine(&self) -> &ApduProtocolEngine {
        &self.engine
    }

    /// The emulated card, mutably
    pub const fn engine_mut(&mut self) -> &mut ApduProtocolEngine {
        &mut self.engine
    }
}

impl CardTransport for VirtualCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.present {
            return Err(TransportError::Connection);
        }
        Ok(self.engine.handle(command))
    }

    fn is_connected(&self) -> bool {
        self.present
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.engine.deactivate();
        self.present = true;
        Ok(())
    }
}
