//! LMDB implementation of ClassStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use poap_store::{ClassRecord, ClassStore, StoreError};
use poap_types::{ClassId, IdentityAddress, Timestamp};

use crate::LmdbError;

pub struct LmdbClassStore {
    pub(crate) env: Arc<Env>,
    pub(crate) classes_db: Database<Bytes, Bytes>,
}

impl LmdbClassStore {
    fn load(&self, wtxn: &RwTxn<'_>, class_id: &ClassId) -> Result<ClassRecord, LmdbError> {
        let val = self
            .classes_db
            .get(wtxn, class_id.as_key())?
            .ok_or_else(|| LmdbError::NotFound(format!("class {}", class_id)))?;
        Ok(bincode::deserialize(val)?)
    }

    /// Read-modify-write of the student set inside one write transaction.
    /// `edit` returns whether it changed the set; unchanged records are not
    /// rewritten.
    fn update_students(
        &self,
        class_id: &ClassId,
        now: Timestamp,
        edit: impl FnOnce(&mut ClassRecord) -> bool,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.load(&wtxn, class_id)?;
        if !edit(&mut record) {
            return Ok(false);
        }
        record.updated_at = now;
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.classes_db
            .put(&mut wtxn, class_id.as_key(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }
}

impl ClassStore for LmdbClassStore {
    fn get_class(&self, class_id: &ClassId) -> Result<ClassRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .classes_db
            .get(&rtxn, class_id.as_key())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("class {}", class_id)))?;
        let record: ClassRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
        Ok(record)
    }

    fn insert_class(&self, record: &ClassRecord) -> Result<(), StoreError> {
        let key = record.class_id.as_key();
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .classes_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("class {}", record.class_id)));
        }
        self.classes_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn update_details(
        &self,
        class_id: &ClassId,
        title: &str,
        description: Option<String>,
        now: Timestamp,
    ) -> Result<ClassRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.load(&wtxn, class_id)?;
        record.title = title.to_string();
        record.description = description;
        record.updated_at = now;
        let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.classes_db
            .put(&mut wtxn, class_id.as_key(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn delete_class(&self, class_id: &ClassId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let deleted = self
            .classes_db
            .delete(&mut wtxn, class_id.as_key())
            .map_err(LmdbError::from)?;
        if !deleted {
            return Err(StoreError::NotFound(format!("class {}", class_id)));
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn add_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.update_students(class_id, now, |record| {
            record.students.insert(student.clone())
        })
    }

    fn remove_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.update_students(class_id, now, |record| record.students.remove(student))
    }

    fn iter_classes(&self) -> Result<Vec<ClassRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.classes_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let record: ClassRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            results.push(record);
        }
        Ok(results)
    }
}
