//! Login proof verification.

use serde::{Deserialize, Serialize};

use poap_crypto::{address_matches, parse_public_key, parse_signature, verify_signature};
use poap_types::IdentityAddress;

use crate::IdentityError;

/// What a client presents at login: a message signed by the key that
/// controls `address`. All binary fields are hex, optionally `0x`-prefixed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProof {
    pub address: String,
    pub public_key: String,
    pub message: String,
    pub signature: String,
}

/// Verifies a login proof and returns the address it authenticates.
pub trait SignatureOracle: Send + Sync {
    fn verify(&self, proof: &LoginProof) -> Result<IdentityAddress, IdentityError>;
}

/// Ed25519 signatures over the raw message bytes. The address must be the
/// one derived from the presented public key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Oracle;

impl SignatureOracle for Ed25519Oracle {
    fn verify(&self, proof: &LoginProof) -> Result<IdentityAddress, IdentityError> {
        let address = IdentityAddress::parse(&proof.address)
            .map_err(|e| IdentityError::InvalidInput(e.to_string()))?;
        if proof.message.is_empty() {
            return Err(IdentityError::InvalidInput("login message is empty".into()));
        }
        let public_key = parse_public_key(&proof.public_key)
            .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;
        let signature = parse_signature(&proof.signature)
            .map_err(|e| IdentityError::InvalidSignature(e.to_string()))?;

        if !verify_signature(proof.message.as_bytes(), &signature, &public_key) {
            return Err(IdentityError::InvalidSignature(
                "signature does not verify".into(),
            ));
        }
        if !address_matches(&public_key, &address) {
            return Err(IdentityError::InvalidSignature(
                "public key does not control the claimed address".into(),
            ));
        }
        Ok(address)
    }
}
