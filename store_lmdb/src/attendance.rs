//! LMDB implementation of AttendanceStore.
//!
//! Three databases back the store:
//! - `attendance`: `id_be` → record
//! - `attendance_by_class`: `class ++ 0 ++ student ++ 0 ++ id_be` → empty
//! - `validated_days`: `class ++ 0 ++ student ++ 0 ++ day_be` → `id_be`
//!
//! `validated_days` is the uniqueness constraint for the once-per-day rule.
//! Its presence check and the record write share one write transaction.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use poap_store::{AttendanceRecord, AttendanceStore, BadgeClaim, CommitOutcome, StoreError};
use poap_types::{AttendanceId, BadgeRef, ClassId, DayIndex, IdentityAddress, Timestamp};

use crate::keys::{class_index_key, class_prefix, pair_prefix, trailing_id, validated_day_key};
use crate::meta::next_sequence;
use crate::LmdbError;

pub struct LmdbAttendanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) attendance_db: Database<Bytes, Bytes>,
    pub(crate) attendance_by_class_db: Database<Bytes, Bytes>,
    pub(crate) validated_days_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbAttendanceStore {
    fn load(&self, txn: &RoTxn<'_>, id: AttendanceId) -> Result<Option<AttendanceRecord>, LmdbError> {
        match self.attendance_db.get(txn, &id.to_be_bytes())? {
            Some(val) => Ok(Some(bincode::deserialize(val)?)),
            None => Ok(None),
        }
    }

    fn require(&self, txn: &RoTxn<'_>, id: AttendanceId) -> Result<AttendanceRecord, LmdbError> {
        self.load(txn, id)?
            .ok_or_else(|| LmdbError::NotFound(format!("attendance {}", id)))
    }

    fn write_record(&self, wtxn: &mut RwTxn<'_>, record: &AttendanceRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.attendance_db
            .put(wtxn, &record.id.to_be_bytes(), &bytes)?;
        Ok(())
    }

    /// The record already holding the day slot for this pair, if any.
    fn day_holder(
        &self,
        txn: &RoTxn<'_>,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, LmdbError> {
        let key = validated_day_key(class_id, student, day);
        let Some(val) = self.validated_days_db.get(txn, &key)? else {
            return Ok(None);
        };
        let id = trailing_id(val)
            .ok_or_else(|| LmdbError::Serialization("malformed validated_days value".into()))?;
        self.load(txn, id)
    }

    fn claim_day(&self, wtxn: &mut RwTxn<'_>, record: &AttendanceRecord, day: DayIndex) -> Result<(), LmdbError> {
        let key = validated_day_key(&record.class_id, &record.student, day);
        self.validated_days_db
            .put(wtxn, &key, &record.id.to_be_bytes())?;
        Ok(())
    }

    fn insert_new(
        &self,
        wtxn: &mut RwTxn<'_>,
        class_id: &ClassId,
        student: &IdentityAddress,
        marked_at: Timestamp,
        validated_at: Option<Timestamp>,
    ) -> Result<AttendanceRecord, LmdbError> {
        let id = AttendanceId::new(next_sequence(&self.meta_db, wtxn)?);
        let record = AttendanceRecord {
            id,
            class_id: class_id.clone(),
            student: student.clone(),
            marked_at: Some(marked_at),
            validated: validated_at.is_some(),
            validated_at,
            badge_ref: None,
            badge_claimed_at: None,
        };
        self.write_record(wtxn, &record)?;
        self.attendance_by_class_db
            .put(wtxn, &class_index_key(class_id, student, id), &[])?;
        Ok(record)
    }

    fn collect_prefix(&self, prefix: &[u8]) -> Result<Vec<AttendanceRecord>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let mut records = Vec::new();
        for result in self.attendance_by_class_db.prefix_iter(&rtxn, prefix)? {
            let (key, _) = result?;
            let id = trailing_id(key)
                .ok_or_else(|| LmdbError::Serialization("malformed class index key".into()))?;
            records.push(self.require(&rtxn, id)?);
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

impl AttendanceStore for LmdbAttendanceStore {
    fn insert_marked(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        marked_at: Timestamp,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let record = self.insert_new(&mut wtxn, class_id, student, marked_at, None)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn get_attendance(&self, id: AttendanceId) -> Result<AttendanceRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.require(&rtxn, id)?)
    }

    fn latest_pending(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let prefix = pair_prefix(class_id, student);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .attendance_by_class_db
            .rev_prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let Some(id) = trailing_id(key) else {
                continue;
            };
            let record = self.require(&rtxn, id)?;
            if !record.validated && record.marked_at.map(|ts| ts.day()) == Some(day) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn validated_on_day(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.day_holder(&rtxn, class_id, student, day)?)
    }

    fn commit_validation(
        &self,
        id: AttendanceId,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.require(&wtxn, id)?;
        let day = validated_at.day();

        if let Some(existing) = self.day_holder(&wtxn, &record.class_id, &record.student, day)? {
            return Ok(CommitOutcome::AlreadyValidated(existing));
        }
        if record.validated {
            return Err(StoreError::InvalidState(format!(
                "attendance {} is already validated",
                id
            )));
        }

        record.validated = true;
        record.validated_at = Some(validated_at);
        self.write_record(&mut wtxn, &record)?;
        self.claim_day(&mut wtxn, &record, day)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(id = %record.id, class_id = %record.class_id, student = %record.student, "attendance validated");
        Ok(CommitOutcome::Committed(record))
    }

    fn insert_validated(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let day = validated_at.day();

        if let Some(existing) = self.day_holder(&wtxn, class_id, student, day)? {
            return Ok(CommitOutcome::AlreadyValidated(existing));
        }

        let record = self.insert_new(&mut wtxn, class_id, student, validated_at, Some(validated_at))?;
        self.claim_day(&mut wtxn, &record, day)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(id = %record.id, class_id = %class_id, student = %student, "attendance created validated");
        Ok(CommitOutcome::Committed(record))
    }

    fn claim_badge(
        &self,
        id: AttendanceId,
        now: Timestamp,
        stale_after_secs: u64,
    ) -> Result<BadgeClaim, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.require(&wtxn, id)?;
        if !record.validated {
            return Err(StoreError::InvalidState(format!(
                "attendance {} is not validated",
                id
            )));
        }
        if let Some(badge_ref) = &record.badge_ref {
            return Ok(BadgeClaim::Issued(badge_ref.clone()));
        }
        if let Some(since) = record.badge_claimed_at {
            if !since.has_expired(stale_after_secs, now) {
                return Ok(BadgeClaim::InFlight { since });
            }
            tracing::warn!(id = %id, since = %since, "taking over stale badge claim");
        }
        record.badge_claimed_at = Some(now);
        self.write_record(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(BadgeClaim::Claimed(record))
    }

    fn release_badge_claim(&self, id: AttendanceId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.require(&wtxn, id)?;
        if record.badge_claimed_at.take().is_some() {
            self.write_record(&mut wtxn, &record)?;
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(())
    }

    fn set_badge_ref(
        &self,
        id: AttendanceId,
        badge_ref: &BadgeRef,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self.require(&wtxn, id)?;
        if !record.validated {
            return Err(StoreError::InvalidState(format!(
                "attendance {} is not validated",
                id
            )));
        }
        if record.badge_ref.is_some() {
            return Err(StoreError::InvalidState(format!(
                "attendance {} already has a badge",
                id
            )));
        }
        record.badge_ref = Some(badge_ref.clone());
        record.badge_claimed_at = None;
        self.write_record(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }

    fn class_attendance(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.collect_prefix(&class_prefix(class_id))?)
    }

    fn student_attendance(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.attendance_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let record: AttendanceRecord = bincode::deserialize(val).map_err(LmdbError::from)?;
            if record.student == *student {
                results.push(record);
            }
        }
        Ok(results)
    }
}
