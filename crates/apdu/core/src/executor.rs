//! Executor for APDU command execution
//!
//! This module combines a card transport with the GET RESPONSE follow-up
//! logic needed to collect responses that the card serves in chunks.

use core::fmt;

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use crate::command::Command;
use crate::response::Response;
use crate::transport::CardTransport;
use crate::{Error, Result, ResultExt};

/// Class byte of GET RESPONSE
pub const GET_RESPONSE_CLA: u8 = 0x00;
/// Instruction byte of GET RESPONSE
pub const GET_RESPONSE_INS: u8 = 0xC0;

/// Trait for APDU command execution
pub trait Executor: Send + fmt::Debug {
    /// Transmit an APDU command and return the complete response
    ///
    /// `61 XX` continuations are followed with GET RESPONSE until the card
    /// reports a final status.
    #[instrument(level = "trace", skip(self), fields(executor = std::any::type_name::<Self>()))]
    fn transmit(&mut self, command: &Command) -> Result<Response> {
        trace!(command = %hex::encode(command.to_bytes()), "Transmitting command");
        let response = self.do_transmit(command);
        match &response {
            Ok(response) => {
                trace!(
                    status = %response.status(),
                    payload_len = response.payload_len(),
                    "Received response"
                );
            }
            Err(err) => {
                debug!(error = ?err, "Error during transmission");
            }
        }
        response
    }

    /// Internal implementation of transmit
    fn do_transmit(&mut self, command: &Command) -> Result<Response>;

    /// Reset the executor, including the transport
    fn reset(&mut self) -> Result<()>;
}

/// Card executor combining a transport with GET RESPONSE chaining
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// Maximum number of GET RESPONSE round trips per command
    max_chain: usize,
    /// The last raw response received
    last_response: Option<Bytes>,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Default bound on GET RESPONSE round trips
    pub const DEFAULT_MAX_CHAIN: usize = 32;

    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            max_chain: Self::DEFAULT_MAX_CHAIN,
            last_response: None,
        }
    }

    /// Set the maximum number of GET RESPONSE round trips per command
    pub const fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Get the last raw response received
    pub const fn last_response(&self) -> Option<&Bytes> {
        self.last_response.as_ref()
    }

    fn exchange(&mut self, command: &Command) -> Result<Response> {
        let response_bytes = self.transport.transmit_raw(&command.to_bytes())?;
        let response = Response::from_bytes(&response_bytes)?;
        self.last_response = Some(response_bytes);
        Ok(response)
    }
}

impl<T: CardTransport> Executor for CardExecutor<T> {
    fn do_transmit(&mut self, command: &Command) -> Result<Response> {
        let mut response = self
            .exchange(command)
            .context("Failed to exchange command")?;

        let mut chain_count = 0;
        while response.more_data_available() {
            if chain_count == self.max_chain {
                return Err(Error::ChainLimitExceeded);
            }

            // 61 00 announces 256 or more bytes, and Le = 00 asks for 256
            let le = response.bytes_available().unwrap_or(0);
            let get_response =
                Command::new_with_le(GET_RESPONSE_CLA, GET_RESPONSE_INS, 0x00, 0x00, le);
            let next = self
                .exchange(&get_response)
                .context("Failed to exchange GET RESPONSE")?;

            response.append(next);
            chain_count += 1;
        }

        Ok(response)
    }

    fn reset(&mut self) -> Result<()> {
        self.last_response = None;
        self.transport.reset().map_err(Error::from)
    }
}
