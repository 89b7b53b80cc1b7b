//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use poap_types::{PrivateKey, PublicKey, Signature};

use crate::CryptoError;

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Returns `true` if the signature is valid, `false` otherwise.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

fn decode_hex(input: &str) -> Result<Vec<u8>, CryptoError> {
    let body = input.trim();
    let body = body.strip_prefix("0x").unwrap_or(body);
    hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

/// Parse a hex-encoded (optionally `0x`-prefixed) public key.
pub fn parse_public_key(input: &str) -> Result<PublicKey, CryptoError> {
    let bytes = decode_hex(input)?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
    Ok(PublicKey(arr))
}

/// Parse a hex-encoded (optionally `0x`-prefixed) signature.
pub fn parse_signature(input: &str) -> Result<Signature, CryptoError> {
    let bytes = decode_hex(input)?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
    Ok(Signature(arr))
}
