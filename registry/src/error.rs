use poap_identity::IdentityError;
use poap_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => RegistryError::NotFound(what),
            other => RegistryError::Store(other),
        }
    }
}

impl From<IdentityError> for RegistryError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound(address) => {
                RegistryError::NotFound(format!("account {address}"))
            }
            IdentityError::Forbidden(msg) => RegistryError::Forbidden(msg),
            IdentityError::Conflict(msg) => RegistryError::Conflict(msg),
            IdentityError::Store(e) => RegistryError::Store(e),
            other => RegistryError::InvalidInput(other.to_string()),
        }
    }
}
