//! Cryptographic primitives for the POAP attendance service.
//!
//! - **Ed25519** for signing and verifying login challenges
//! - **Blake2b** for hashing
//! - Address derivation: `0x` + hex of the last 20 bytes of Blake2b-256(public_key)

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{address_matches, derive_address};
pub use error::CryptoError;
pub use hash::blake2b_256;
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{parse_public_key, parse_signature, sign_message, verify_signature};
