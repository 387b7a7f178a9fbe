//! Card signing key.

use std::{
    fmt, fs,
    io::{self, Write},
    path::Path,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use k256::{
    ecdsa::{Signature, SigningKey, signature::Signer},
    pkcs8::EncodePublicKey,
};
use tracing::{debug, info};

use crate::{Error, Result};

/// Opaque signer behind the card identity
///
/// Both methods return base64 text, the form in which signatures and keys
/// travel inside JSON payloads.
pub trait SigningService: Send + Sync + fmt::Debug {
    /// Sign `message`, returning the encoded signature
    fn sign(&self, message: &[u8]) -> Result<String>;

    /// The encoded public key readers verify signatures with
    fn public_key(&self) -> Result<String>;
}

/// ECDSA secp256k1 signer holding its key in process memory
///
/// Signatures are SHA-256 ECDSA, DER encoded. The public key is a DER
/// SubjectPublicKeyInfo.
#[derive(Clone)]
pub struct SoftwareSigner {
    key: SigningKey,
}

impl fmt::Debug for SoftwareSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareSigner").finish_non_exhaustive()
    }
}

impl SoftwareSigner {
    /// Default key file name inside a data directory
    pub const KEY_FILE_NAME: &'static str = "card_key.hex";

    /// Wrap an existing key
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Fresh random key
    pub fn generate() -> Self {
        Self::new(SigningKey::random(&mut rand_v8::thread_rng()))
    }

    /// Key from its hex encoded scalar
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim()).map_err(|_| Error::InvalidKey("not hex"))?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| Error::InvalidKey("not a secp256k1 scalar"))?;
        Ok(Self::new(key))
    }

    /// Hex encoded scalar
    pub fn to_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Load the key stored at `path`, creating and storing one if absent
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                debug!(path = %path.display(), "Loaded card key");
                Self::from_hex(&contents)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let signer = Self::generate();
                let mut file = fs::File::create(path)?;
                file.write_all(signer.to_hex().as_bytes())?;
                file.sync_all()?;
                info!(path = %path.display(), "Generated new card key");
                Ok(signer)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The underlying key
    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl SigningService for SoftwareSigner {
    fn sign(&self, message: &[u8]) -> Result<String> {
        let signature: Signature = self.key.try_sign(message)?;
        Ok(STANDARD.encode(signature.to_der().as_bytes()))
    }

    fn public_key(&self) -> Result<String> {
        let der = self.key.verifying_key().to_public_key_der()?;
        Ok(STANDARD.encode(der.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use k256::{
        ecdsa::{VerifyingKey, signature::Verifier},
        pkcs8::DecodePublicKey,
    };

    use super::*;

    #[test]
    fn test_signature_verifies_against_public_key() {
        let signer = SoftwareSigner::generate();
        let message = b"{\"nonce\":\"abc\"}uid-1";

        let signature = STANDARD.decode(signer.sign(message).unwrap()).unwrap();
        let signature = Signature::from_der(&signature).unwrap();

        let public_key = STANDARD.decode(signer.public_key().unwrap()).unwrap();
        let verifying_key = VerifyingKey::from_public_key_der(&public_key).unwrap();

        assert!(verifying_key.verify(message, &signature).is_ok());
        assert!(verifying_key.verify(b"other", &signature).is_err());
    }

    #[test]
    fn test_hex_round_trip_keeps_identity() {
        let signer = SoftwareSigner::generate();
        let restored = SoftwareSigner::from_hex(&signer.to_hex()).unwrap();
        assert_eq!(signer.public_key().unwrap(), restored.public_key().unwrap());

        assert!(matches!(
            SoftwareSigner::from_hex("zz"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_load_or_generate_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SoftwareSigner::KEY_FILE_NAME);

        let first = SoftwareSigner::load_or_generate(&path).unwrap();
        let second = SoftwareSigner::load_or_generate(&path).unwrap();
        assert_eq!(first.public_key().unwrap(), second.public_key().unwrap());
    }
}
