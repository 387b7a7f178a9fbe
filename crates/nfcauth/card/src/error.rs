/// Result type for card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for card operations
///
/// None of these ever reach the transport: the protocol engine turns every
/// error into a status word.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request body is not UTF-8 JSON of the expected shape
    #[error("Malformed request payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// Request body is not UTF-8
    #[error("Request payload is not UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Signing with the card key failed
    #[error("Signing failed: {0}")]
    Signing(#[from] k256::ecdsa::Error),

    /// Public key encoding failed
    #[error("Public key encoding failed: {0}")]
    PublicKeyEncoding(#[from] k256::pkcs8::spki::Error),

    /// Stored key material is unusable
    #[error("Invalid key material: {0}")]
    InvalidKey(&'static str),

    /// Backing storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// A human-facing value failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}
