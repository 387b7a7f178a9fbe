//! The card side of the nfcauth protocol.
//!
//! [`ApduProtocolEngine::handle`] maps one command APDU to one response APDU.
//! It never blocks on the user: anything human-paced is requested through the
//! [`UiNotifier`] and its outcome observed on a later command through the
//! shared [`AuthGate`], [`PendingRegistrationStore`] and [`Registry`].

use std::{
    panic::{self, AssertUnwindSafe},
    str,
    sync::Arc,
};

use bytes::Bytes;
use nfcauth_apdu_core::{Response, StatusWord, status};
use tracing::{Level, debug, error, info, trace, warn};

use crate::{
    Result,
    auth_gate::AuthGate,
    chunker::ResponseChunker,
    constants::{NFCAUTH_AID, headers},
    messages::{AuthMode, AuthenticationRequest, AuthenticationResponse, RegistrationRequest},
    pending::PendingRegistrationStore,
    registry::{Reader, Registry},
    signer::SigningService,
    ui::UiNotifier,
};

/// Offset of `Lc` in a command carrying data
const LC_OFFSET: usize = 4;
/// Offset of the data field
const DATA_OFFSET: usize = 5;

/// Command/response state machine of the emulated card
///
/// Owns the response chunker; shares the other state with the confirmation
/// flows.
#[derive(Debug)]
pub struct ApduProtocolEngine {
    gate: Arc<AuthGate>,
    pending: Arc<dyn PendingRegistrationStore>,
    registry: Arc<dyn Registry>,
    signer: Arc<dyn SigningService>,
    ui: Arc<dyn UiNotifier>,
    chunker: ResponseChunker,
}

impl ApduProtocolEngine {
    /// Create an engine over the given shared state and collaborators
    pub fn new(
        gate: Arc<AuthGate>,
        pending: Arc<dyn PendingRegistrationStore>,
        registry: Arc<dyn Registry>,
        signer: Arc<dyn SigningService>,
        ui: Arc<dyn UiNotifier>,
    ) -> Self {
        Self {
            gate,
            pending,
            registry,
            signer,
            ui,
            chunker: ResponseChunker::new(),
        }
    }

    /// Process one command APDU
    ///
    /// Always produces a response: failures inside the engine or its
    /// collaborators, panics included, become `6F 00`.
    pub fn handle(&mut self, apdu: &[u8]) -> Bytes {
        trace!(command = %hex::encode(apdu), "Handling command");
        let name = command_name(apdu);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(apdu)));
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(command = name, error = %e, "Command failed");
                Response::status_only(status::PROCESSING_ERROR)
            }
            Err(_) => {
                error!(command = name, "Command handler panicked");
                Response::status_only(status::PROCESSING_ERROR)
            }
        };

        log_status(name, &response);
        let bytes = response.to_bytes();
        trace!(response = %hex::encode(&bytes), "Command handled");
        bytes
    }

    /// Session teardown: the field was lost or the reader went away
    ///
    /// Only the staged response is dropped. Authentication outlives the
    /// session until its TTL and the registry is untouched.
    pub fn deactivate(&mut self) {
        debug!("Session deactivated");
        self.chunker.clear();
    }

    /// The authentication gate shared with the biometric flow
    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }

    fn dispatch(&mut self, apdu: &[u8]) -> Result<Response> {
        let Some(header) = apdu.first_chunk::<4>() else {
            warn!(len = apdu.len(), "Command shorter than a header");
            return Ok(unknown());
        };

        match *header {
            headers::SELECT => Ok(data_field(apdu).map_or_else(unknown, |aid| self.select(aid))),
            headers::REGISTER => match data_field(apdu) {
                Some(body) => self.register(body),
                None => Ok(unknown()),
            },
            headers::REGISTER_COMPLETE => self.register_complete(),
            headers::AUTHENTICATE => match data_field(apdu) {
                Some(body) => self.authenticate(body),
                None => Ok(unknown()),
            },
            headers::GET_RESPONSE => Ok(self.get_response(apdu)),
            headers::NOT_REGISTERED => Ok(self.not_registered()),
            _ => {
                warn!(header = %hex::encode(header), "Unknown command");
                Ok(unknown())
            }
        }
    }

    fn select(&self, aid: &[u8]) -> Response {
        if aid == NFCAUTH_AID {
            self.ui.haptic_feedback();
            Response::success(None)
        } else {
            debug!(aid = %hex::encode(aid), "SELECT for another application");
            Response::status_only(status::FILE_NOT_FOUND)
        }
    }

    fn register(&mut self, body: &[u8]) -> Result<Response> {
        let request: RegistrationRequest = serde_json::from_str(str::from_utf8(body)?)?;
        let Some((reader_id, reader_name)) = request.validated() else {
            warn!(?request, "Rejected registration request");
            return Ok(unknown());
        };

        match self.pending.get()? {
            Some(record) if record.reader_id == reader_id => {
                debug!(reader_id, user_id = %record.user_id, "Delivering confirmed registration");
                let payload = serde_json::to_vec(&record)?;
                Ok(Response::status_only(self.chunker.load(payload)))
            }
            stale => {
                if let Some(stale) = stale {
                    debug!(reader_id, stale_reader_id = %stale.reader_id, "Pending registration belongs to another reader");
                }
                debug!(reader_id, reader_name, "Awaiting registration confirmation");
                self.ui.start_registration_confirmation(reader_id, reader_name);
                self.ui.haptic_feedback();
                Ok(Response::success(None))
            }
        }
    }

    fn register_complete(&self) -> Result<Response> {
        let Some(record) = self.pending.get()? else {
            warn!("Registration completion without a pending registration");
            return Ok(Response::status_only(status::GENERIC_ERROR));
        };
        if !record.is_complete() {
            warn!(reader_id = %record.reader_id, "Pending registration has blank fields");
            return Ok(Response::status_only(status::GENERIC_ERROR));
        }

        let previous = self.registry.get(&record.reader_id)?;
        let reader_id = record.reader_id.clone();
        self.registry.put(Reader {
            reader_id: record.reader_id,
            reader_name: record.reader_name,
            user_id: record.user_id,
            user_name: record.user_name,
        })?;

        // A commit the reader is told failed must leave the registry as it was
        if let Err(e) = self.pending.clear() {
            let restored = match previous {
                Some(previous) => self.registry.put(previous),
                None => self.registry.delete(&reader_id).map(drop),
            };
            if let Err(restore) = restored {
                error!(reader_id = %reader_id, error = %restore, "Cannot restore registry after failed commit");
            }
            return Err(e);
        }
        self.ui.haptic_feedback();
        Ok(Response::success(None))
    }

    fn authenticate(&mut self, body: &[u8]) -> Result<Response> {
        let request: AuthenticationRequest = serde_json::from_str(str::from_utf8(body)?)?;
        let Some(valid) = request.validated() else {
            warn!(?request, "Rejected authentication request");
            return Ok(unknown());
        };

        let Some(reader) = self.registry.get(valid.reader_id)? else {
            info!(reader_id = valid.reader_id, "Authentication from unregistered reader");
            self.ui.notify_not_registered();
            self.ui.haptic_feedback();
            return Ok(Response::status_only(status::UNAUTHORIZED));
        };

        match AuthMode::from_wire(valid.auth) {
            Some(AuthMode::Background) => {}
            Some(AuthMode::Biometric) => {
                if !self.gate.is_authenticated() {
                    debug!(reader_id = valid.reader_id, "Biometric confirmation required");
                    self.ui.start_biometric_prompt();
                    self.ui.haptic_feedback();
                    return Ok(Response::status_only(status::BIOMETRIC_REQUIRED));
                }
            }
            None => {
                warn!(auth = valid.auth, "Unsupported authentication mode");
                return Ok(unknown());
            }
        }

        // Bind the exact request to the identity resolved for this reader
        let mut message = Vec::with_capacity(body.len() + reader.user_id.len());
        message.extend_from_slice(body);
        message.extend_from_slice(reader.user_id.as_bytes());
        let signature = self.signer.sign(&message)?;

        let payload = serde_json::to_vec(&AuthenticationResponse {
            user_id: reader.user_id,
            signature,
        })?;
        self.ui.haptic_feedback();
        info!(reader_id = %reader.reader_id, "Authenticated to reader");
        Ok(Response::status_only(self.chunker.load(payload)))
    }

    fn get_response(&mut self, apdu: &[u8]) -> Response {
        // Header and the requested length, nothing else
        if apdu.len() != DATA_OFFSET {
            warn!(len = apdu.len(), "Malformed GET RESPONSE");
            return unknown();
        }
        self.chunker.retrieve(apdu[LC_OFFSET]).unwrap_or_else(|| {
            debug!("GET RESPONSE with nothing staged");
            unknown()
        })
    }

    fn not_registered(&self) -> Response {
        self.ui.notify_not_registered();
        self.ui.haptic_feedback();
        Response::success(None)
    }
}

/// Data field of a command carrying `Lc` and data; trailing bytes are ignored
fn data_field(apdu: &[u8]) -> Option<&[u8]> {
    let lc = *apdu.get(LC_OFFSET)? as usize;
    apdu.get(DATA_OFFSET..DATA_OFFSET + lc)
}

fn unknown() -> Response {
    Response::status_only(status::UNKNOWN_COMMAND)
}

fn command_name(apdu: &[u8]) -> &'static str {
    match apdu.first_chunk::<4>() {
        Some(&headers::SELECT) => "SELECT",
        Some(&headers::REGISTER) => "REGISTER",
        Some(&headers::REGISTER_COMPLETE) => "REGISTER_COMPLETE",
        Some(&headers::AUTHENTICATE) => "AUTHENTICATE",
        Some(&headers::GET_RESPONSE) => "GET_RESPONSE",
        Some(&headers::NOT_REGISTERED) => "NOT_REGISTERED",
        _ => "UNKNOWN",
    }
}

fn log_status(command: &'static str, response: &Response) {
    let status: StatusWord = response.status();
    let payload_len = response.payload_len();
    let level = status.tracing_level();
    if level == Level::DEBUG {
        debug!(command, %status, payload_len, "Responding");
    } else if level == Level::INFO {
        info!(command, %status, payload_len, "Responding");
    } else {
        warn!(command, %status, desc = status.description(), "Responding");
    }
}
