//! Identity Resolver for the POAP attendance service.
//!
//! Maps an authenticated caller to a stored [`Identity`](poap_types::Identity)
//! and its [`Role`](poap_types::Role). Authentication itself is split in two:
//! a [`SignatureOracle`] proves control of an address at login, and
//! [`SessionKeys`] issue and check the session token carried afterwards.

pub mod error;
pub mod oracle;
pub mod resolver;
pub mod session;

pub use error::IdentityError;
pub use oracle::{Ed25519Oracle, LoginProof, SignatureOracle};
pub use resolver::{IdentityResolver, NewIdentity, ProfileUpdate};
pub use session::{SessionClaims, SessionKeys, SessionToken, DEFAULT_SESSION_TTL_SECS};
