//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::attendance::LmdbAttendanceStore;
use crate::class::LmdbClassStore;
use crate::identity::LmdbIdentityStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// Names of every database in the environment.
pub const DATABASE_NAMES: &[&str] = &[
    "identities",
    "classes",
    "attendance",
    "attendance_by_class",
    "validated_days",
    "meta",
];

/// Default number of named databases the environment reserves.
pub const DEFAULT_MAX_DBS: u32 = 16;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) identities_db: Database<Bytes, Bytes>,
    pub(crate) classes_db: Database<Bytes, Bytes>,
    pub(crate) attendance_db: Database<Bytes, Bytes>,
    pub(crate) attendance_by_class_db: Database<Bytes, Bytes>,
    pub(crate) validated_days_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, create any
    /// missing databases, and bring the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {e}", path.display())))?;

        // SAFETY: the environment is opened once per process for this path,
        // and the memory map is never modified outside of heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let identities_db = env.create_database(&mut wtxn, Some("identities"))?;
        let classes_db = env.create_database(&mut wtxn, Some("classes"))?;
        let attendance_db = env.create_database(&mut wtxn, Some("attendance"))?;
        let attendance_by_class_db = env.create_database(&mut wtxn, Some("attendance_by_class"))?;
        let validated_days_db = env.create_database(&mut wtxn, Some("validated_days"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let this = Self {
            env: Arc::new(env),
            identities_db,
            classes_db,
            attendance_db,
            attendance_by_class_db,
            validated_days_db,
            meta_db,
        };

        Migrator::run(&this.meta_store())?;

        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(this)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn identity_store(&self) -> LmdbIdentityStore {
        LmdbIdentityStore {
            env: self.env.clone(),
            identities_db: self.identities_db,
        }
    }

    pub fn class_store(&self) -> LmdbClassStore {
        LmdbClassStore {
            env: self.env.clone(),
            classes_db: self.classes_db,
        }
    }

    pub fn attendance_store(&self) -> LmdbAttendanceStore {
        LmdbAttendanceStore {
            env: self.env.clone(),
            attendance_db: self.attendance_db,
            attendance_by_class_db: self.attendance_by_class_db,
            validated_days_db: self.validated_days_db,
            meta_db: self.meta_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: self.env.clone(),
            meta_db: self.meta_db,
        }
    }

    /// Flush the memory map to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poap_store::MetaStore;

    #[test]
    fn open_creates_directory_and_sets_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db");
        let env = LmdbEnvironment::open(&path, DEFAULT_MAX_DBS, 16 * 1024 * 1024).unwrap();
        assert!(path.join("data.mdb").exists());
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            crate::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn reopen_keeps_data() {
        use poap_store::MetaStore;
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAX_DBS, 16 * 1024 * 1024).unwrap();
            env.meta_store().put_meta("marker", b"1").unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAX_DBS, 16 * 1024 * 1024).unwrap();
        assert_eq!(env.meta_store().get_meta("marker").unwrap(), Some(b"1".to_vec()));
    }
}
