//! LMDB implementation of IdentityStore.
//!
//! Keyed by the lowercase address string, so lookups are case-insensitive
//! by construction.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use poap_store::{IdentityStore, StoreError};
use poap_types::{Identity, IdentityAddress};

use crate::LmdbError;

pub struct LmdbIdentityStore {
    pub(crate) env: Arc<Env>,
    pub(crate) identities_db: Database<Bytes, Bytes>,
}

impl IdentityStore for LmdbIdentityStore {
    fn get_identity(&self, address: &IdentityAddress) -> Result<Identity, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .identities_db
            .get(&rtxn, address.as_key())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("identity {}", address)))?;
        let identity: Identity = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(identity)
    }

    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let key = identity.address().as_key();
        let bytes = bincode::serialize(identity).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .identities_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "identity {}",
                identity.address()
            )));
        }
        self.identities_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let bytes = bincode::serialize(identity).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.identities_db
            .put(&mut wtxn, identity.address().as_key(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_identity(&self, address: &IdentityAddress) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let deleted = self
            .identities_db
            .delete(&mut wtxn, address.as_key())
            .map_err(LmdbError::from)?;
        if !deleted {
            return Err(StoreError::NotFound(format!("identity {}", address)));
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn identity_exists(&self, address: &IdentityAddress) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .identities_db
            .get(&rtxn, address.as_key())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }

    fn iter_identities(&self) -> Result<Vec<Identity>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.identities_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let identity: Identity = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(identity);
        }
        Ok(results)
    }
}
