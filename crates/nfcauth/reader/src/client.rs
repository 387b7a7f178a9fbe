//! Reader side of the nfcauth handshakes.

use nfcauth_apdu_core::{
    CardExecutor, CardTransport, Command, Executor, Response, StatusWord, status,
};
use nfcauth_card::{
    AuthMode, AuthenticationRequest, AuthenticationResponse, PendingRegistration,
    RegistrationRequest,
    constants::{NFCAUTH_AID, headers},
};
use rand_v8::RngCore;
use tracing::{debug, info, instrument, warn};

use crate::{
    Error, ReaderConfig, Result,
    enrollments::{Enrollment, Enrollments},
    verification::{decode_public_key, signed_message, verify_signature},
};

/// Result of an authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The card proved an enrolled identity
    Authenticated {
        /// Verified user id
        user_id: String,
        /// Enrolled display name
        user_name: String,
    },
    /// The user must confirm on the card first; retry afterwards
    BiometricRequired,
    /// The card has no registration for this reader
    NotRegistered,
}

/// Client driving an nfcauth card through a transport
#[derive(Debug)]
pub struct ReaderClient<T: CardTransport> {
    executor: CardExecutor<T>,
    config: ReaderConfig,
    enrollments: Enrollments,
    /// User enrolled from a delivered registration the card has not committed
    uncommitted: Option<String>,
}

impl<T: CardTransport> ReaderClient<T> {
    /// Create a client with no enrolled users
    pub fn new(transport: T, config: ReaderConfig) -> Self {
        let executor = CardExecutor::new(transport).with_max_chain(config.max_chain);
        Self {
            executor,
            config,
            enrollments: Enrollments::new(),
            uncommitted: None,
        }
    }

    /// Start from previously enrolled users
    pub fn with_enrollments(mut self, enrollments: Enrollments) -> Self {
        self.enrollments = enrollments;
        self
    }

    /// Reader configuration
    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Enrolled users
    pub const fn enrollments(&self) -> &Enrollments {
        &self.enrollments
    }

    /// The underlying transport
    pub const fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// The underlying transport, mutably
    pub const fn transport_mut(&mut self) -> &mut T {
        self.executor.transport_mut()
    }

    /// Take back the transport and the enrolled users
    pub fn into_parts(self) -> (T, Enrollments) {
        (self.executor.into_transport(), self.enrollments)
    }

    /// Select the nfcauth application
    #[instrument(level = "debug", skip(self))]
    pub fn select_application(&mut self) -> Result<()> {
        let command = Command::from_header(headers::SELECT).with_data(NFCAUTH_AID)?;
        let response = self.executor.transmit(&command)?;
        expect_status("SELECT", &response, status::SUCCESS)?;
        debug!("Application selected");
        Ok(())
    }

    /// Ask the card to register this reader
    ///
    /// Returns `None` while the user has not confirmed yet; the reader polls
    /// by calling again. Once delivered, the user is enrolled and the
    /// registration must be committed with
    /// [`complete_registration`](Self::complete_registration).
    #[instrument(level = "debug", skip(self), fields(reader_id = %self.config.reader_id))]
    pub fn request_registration(&mut self) -> Result<Option<Enrollment>> {
        let request = RegistrationRequest {
            reader_id: Some(self.config.reader_id.clone()),
            reader_name: Some(self.config.reader_name.clone()),
            version: Some(self.config.protocol_version),
        };
        let command =
            Command::from_header(headers::REGISTER).with_data(serde_json::to_vec(&request)?)?;
        let response = self.executor.transmit(&command)?;
        expect_status("REGISTER", &response, status::SUCCESS)?;

        let Some(payload) = response.payload() else {
            debug!("Awaiting confirmation on the card");
            return Ok(None);
        };
        let registration: PendingRegistration = serde_json::from_slice(payload)?;
        if registration.reader_id != self.config.reader_id {
            return Err(Error::ReaderMismatch(registration.reader_id));
        }

        let enrollment = self.enrollments.enroll(&registration)?;
        self.uncommitted = Some(enrollment.user_id.clone());
        info!(user_id = %enrollment.user_id, user_name = %enrollment.user_name, "Registration delivered");
        Ok(Some(enrollment))
    }

    /// Commit the delivered registration on the card
    ///
    /// If the card does not confirm the commit, the user enrolled by
    /// [`request_registration`](Self::request_registration) is withdrawn.
    #[instrument(level = "debug", skip(self))]
    pub fn complete_registration(&mut self) -> Result<()> {
        let command = Command::from_header(headers::REGISTER_COMPLETE);
        let committed = self
            .executor
            .transmit(&command)
            .map_err(Error::from)
            .and_then(|response| expect_status("REGISTER_COMPLETE", &response, status::SUCCESS));

        if let (Err(_), Some(user_id)) = (&committed, self.uncommitted.take()) {
            warn!(user_id = %user_id, "Card did not commit the registration, withdrawing enrollment");
            self.enrollments.remove(&user_id);
        }
        committed
    }

    /// Challenge the card for a signature in the given mode
    ///
    /// The nonce is fresh for every call. A returned signature is verified
    /// against the enrolled key over the exact request sent.
    #[instrument(level = "debug", skip(self), fields(reader_id = %self.config.reader_id))]
    pub fn authenticate(&mut self, mode: AuthMode) -> Result<AuthOutcome> {
        let request = AuthenticationRequest {
            reader_id: Some(self.config.reader_id.clone()),
            nonce: Some(self.nonce()),
            auth: Some(mode.as_str().to_string()),
            version: Some(self.config.protocol_version),
        };
        let body = serde_json::to_vec(&request)?;
        let command = Command::from_header(headers::AUTHENTICATE).with_data(body.clone())?;
        let response = self.executor.transmit(&command)?;

        match response.status() {
            status::UNAUTHORIZED => {
                info!("Card is not registered with this reader");
                Ok(AuthOutcome::NotRegistered)
            }
            status::BIOMETRIC_REQUIRED => {
                debug!("Card requires biometric confirmation");
                Ok(AuthOutcome::BiometricRequired)
            }
            status::SUCCESS => {
                let payload = response
                    .payload()
                    .as_ref()
                    .ok_or(Error::MissingPayload("AUTHENTICATE"))?;
                let answer: AuthenticationResponse = serde_json::from_slice(payload)?;
                let enrollment = self
                    .enrollments
                    .get(&answer.user_id)
                    .ok_or_else(|| Error::UnknownUser(answer.user_id.clone()))?;

                let key = decode_public_key(&enrollment.public_key)?;
                let message = signed_message(&body, &answer.user_id);
                verify_signature(&key, &message, &answer.signature, &answer.user_id)?;

                info!(user_id = %answer.user_id, "User authenticated");
                Ok(AuthOutcome::Authenticated {
                    user_name: enrollment.user_name.clone(),
                    user_id: answer.user_id,
                })
            }
            status => Err(unexpected("AUTHENTICATE", status)),
        }
    }

    /// Authenticate in the configured default mode
    pub fn authenticate_default(&mut self) -> Result<AuthOutcome> {
        self.authenticate(self.config.auth)
    }

    /// Tell the user on the card that this reader does not know them
    #[instrument(level = "debug", skip(self))]
    pub fn notify_not_registered(&mut self) -> Result<()> {
        let command = Command::from_header(headers::NOT_REGISTERED);
        let response = self.executor.transmit(&command)?;
        expect_status("NOT_REGISTERED", &response, status::SUCCESS)
    }

    /// Drop the session with the card
    pub fn reset(&mut self) -> Result<()> {
        self.executor.reset()?;
        Ok(())
    }

    fn nonce(&self) -> String {
        let mut bytes = vec![0u8; self.config.nonce_length];
        rand_v8::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

fn expect_status(operation: &'static str, response: &Response, expected: StatusWord) -> Result<()> {
    if response.status() == expected {
        Ok(())
    } else {
        Err(unexpected(operation, response.status()))
    }
}

fn unexpected(operation: &'static str, status: StatusWord) -> Error {
    warn!(operation, %status, "Unexpected status from card");
    Error::UnexpectedStatus { operation, status }
}
