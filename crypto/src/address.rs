//! Identity address derivation from public keys.
//!
//! Address format: `0x` + hex(last 20 bytes of Blake2b-256(public_key)).

use poap_types::{IdentityAddress, PublicKey};

use crate::hash::blake2b_256;

/// Derive the identity address controlled by `public_key`.
pub fn derive_address(public_key: &PublicKey) -> IdentityAddress {
    let digest = blake2b_256(&public_key.0);
    let mut tail = [0u8; 20];
    tail.copy_from_slice(&digest[12..]);
    IdentityAddress::from_bytes(&tail)
}

/// Whether `public_key` controls `address`.
pub fn address_matches(public_key: &PublicKey, address: &IdentityAddress) -> bool {
    derive_address(public_key) == *address
}
