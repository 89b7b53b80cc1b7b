use poap_store::StoreError;
use poap_types::IdentityAddress;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no account for address {0}")]
    NotFound(IdentityAddress),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("session token error: {0}")]
    Token(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
