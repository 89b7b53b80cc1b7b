//! Metadata storage trait.

use crate::StoreError;

/// Bookkeeping that does not belong to a domain store: the schema version
/// and any service-level markers (e.g. which admins were bootstrapped).
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Returns `None` when the key was never written.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Current schema version; `0` for a freshly created database.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
