use nfcauth_apdu_core::StatusWord;

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reader operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// APDU exchange failed
    #[error(transparent)]
    Apdu(#[from] nfcauth_apdu_core::Error),

    /// The card answered with a status the operation does not expect
    #[error("Card answered {operation} with {status}: {desc}", desc = .status.description())]
    UnexpectedStatus {
        /// Operation that was attempted
        operation: &'static str,
        /// Status returned by the card
        status: StatusWord,
    },

    /// The card answered success without the expected payload
    #[error("Card answered {0} without a payload")]
    MissingPayload(&'static str),

    /// A payload could not be encoded or decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The card delivered a registration meant for another reader
    #[error("Registration delivered for reader {0}")]
    ReaderMismatch(String),

    /// A delivered registration has blank identity fields
    #[error("Registration for {0} is incomplete")]
    IncompleteRegistration(String),

    /// A signature came back for a user this reader never enrolled
    #[error("Unknown user {0}")]
    UnknownUser(String),

    /// The public key of an enrollment cannot be decoded
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature cannot be decoded
    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),

    /// The signature does not verify against the enrolled key
    #[error("Signature verification failed for user {0}")]
    SignatureMismatch(String),

    /// Enrollment storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}

impl From<nfcauth_apdu_core::TransportError> for Error {
    fn from(error: nfcauth_apdu_core::TransportError) -> Self {
        Self::Apdu(error.into())
    }
}
