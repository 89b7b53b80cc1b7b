//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use poap_store::{MetaStore, StoreError};

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Last allocated attendance id, big-endian u64.
pub(crate) const ATTENDANCE_SEQ_KEY: &[u8] = b"attendance_seq";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

/// Bump the attendance id sequence inside an open write transaction and
/// return the new value. Ids start at 1.
pub(crate) fn next_sequence(
    meta_db: &Database<Bytes, Bytes>,
    wtxn: &mut RwTxn<'_>,
) -> Result<u64, LmdbError> {
    let current = match meta_db.get(wtxn, ATTENDANCE_SEQ_KEY)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Serialization("attendance_seq has unexpected byte length".to_string())
            })?;
            u64::from_be_bytes(arr)
        }
        None => 0,
    };
    let next = current + 1;
    meta_db.put(wtxn, ATTENDANCE_SEQ_KEY, &next.to_be_bytes())?;
    Ok(next)
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization(
                        "schema_version has unexpected byte length".to_string(),
                    )
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let bytes = version.to_le_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{LmdbEnvironment, DEFAULT_MAX_DBS};

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAX_DBS, 16 << 20).unwrap();
        let meta = env.meta_store();
        assert_eq!(meta.get_meta("nope").unwrap(), None);
        meta.put_meta("k", b"v").unwrap();
        assert_eq!(meta.get_meta("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn sequence_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAX_DBS, 16 << 20).unwrap();
        let mut wtxn = env.env().write_txn().unwrap();
        assert_eq!(next_sequence(&env.meta_db, &mut wtxn).unwrap(), 1);
        assert_eq!(next_sequence(&env.meta_db, &mut wtxn).unwrap(), 2);
        wtxn.commit().unwrap();
    }
}
