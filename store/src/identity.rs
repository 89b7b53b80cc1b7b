//! Identity storage trait.

use crate::StoreError;
use poap_types::{Identity, IdentityAddress};

/// Trait for identity (account) storage operations.
pub trait IdentityStore {
    fn get_identity(&self, address: &IdentityAddress) -> Result<Identity, StoreError>;

    /// Insert a new identity. Fails with [`StoreError::Duplicate`] if the
    /// address is already registered.
    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Insert or overwrite an identity.
    fn put_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Remove an account. Fails with [`StoreError::NotFound`] if absent.
    fn delete_identity(&self, address: &IdentityAddress) -> Result<(), StoreError>;

    fn identity_exists(&self, address: &IdentityAddress) -> Result<bool, StoreError>;

    fn iter_identities(&self) -> Result<Vec<Identity>, StoreError>;
}
