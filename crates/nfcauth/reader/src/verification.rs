//! Verification of card signatures.

use base64::{Engine, engine::general_purpose::STANDARD};
use k256::{
    ecdsa::{Signature, VerifyingKey, signature::Verifier},
    pkcs8::DecodePublicKey,
};

use crate::{Error, Result};

/// Decode a base64 DER SubjectPublicKeyInfo as delivered at registration
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey> {
    let der = STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
    VerifyingKey::from_public_key_der(&der).map_err(|e| Error::InvalidPublicKey(e.to_string()))
}

/// Check a base64 DER signature over `message`
///
/// `user_id` only labels the error.
pub fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature: &str,
    user_id: &str,
) -> Result<()> {
    let der = STANDARD
        .decode(signature)
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    let signature = Signature::from_der(&der).map_err(|e| Error::InvalidSignature(e.to_string()))?;
    key.verify(message, &signature)
        .map_err(|_| Error::SignatureMismatch(user_id.to_string()))
}

/// The message a card signs: the request body followed by the user id
pub fn signed_message(request: &[u8], user_id: &str) -> Vec<u8> {
    let mut message = Vec::with_capacity(request.len() + user_id.len());
    message.extend_from_slice(request);
    message.extend_from_slice(user_id.as_bytes());
    message
}

#[cfg(test)]
mod tests {
    use nfcauth_card::{SigningService, SoftwareSigner};

    use super::*;

    #[test]
    fn test_verifies_card_signature() {
        let signer = SoftwareSigner::generate();
        let key = decode_public_key(&signer.public_key().unwrap()).unwrap();

        let message = signed_message(b"{\"nonce\":\"00ff\"}", "uid-1");
        let signature = signer.sign(&message).unwrap();
        verify_signature(&key, &message, &signature, "uid-1").unwrap();

        // Same request bound to another identity
        let other = signed_message(b"{\"nonce\":\"00ff\"}", "uid-2");
        assert!(matches!(
            verify_signature(&key, &other, &signature, "uid-2"),
            Err(Error::SignatureMismatch(user)) if user == "uid-2"
        ));
    }

    #[test]
    fn test_rejects_bad_encodings() {
        assert!(matches!(
            decode_public_key("%%%"),
            Err(Error::InvalidPublicKey(_))
        ));
        assert!(matches!(
            decode_public_key("AAAA"),
            Err(Error::InvalidPublicKey(_))
        ));

        let signer = SoftwareSigner::generate();
        let key = signer.signing_key().verifying_key();
        assert!(matches!(
            verify_signature(key, b"m", "AAAA", "u"),
            Err(Error::InvalidSignature(_))
        ));
    }
}
