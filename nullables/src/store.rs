//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All state sits behind one mutex, so every check-and-commit is a single
//! critical section, matching the atomicity the LMDB backend gets from its
//! single writer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use poap_store::{
    AttendanceRecord, AttendanceStore, BadgeClaim, ClassRecord, ClassStore, CommitOutcome,
    IdentityStore, MetaStore, StoreError,
};
use poap_types::{
    AttendanceId, BadgeRef, ClassId, DayIndex, Identity, IdentityAddress, Timestamp,
};

#[derive(Default)]
struct State {
    identities: BTreeMap<IdentityAddress, Identity>,
    classes: BTreeMap<ClassId, ClassRecord>,
    attendance: BTreeMap<AttendanceId, AttendanceRecord>,
    validated_days: HashMap<(ClassId, IdentityAddress, DayIndex), AttendanceId>,
    meta: HashMap<String, Vec<u8>>,
    last_id: u64,
}

impl State {
    fn day_holder(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Option<AttendanceRecord> {
        self.validated_days
            .get(&(class_id.clone(), student.clone(), day))
            .and_then(|id| self.attendance.get(id))
            .cloned()
    }

    fn insert_new(
        &mut self,
        class_id: &ClassId,
        student: &IdentityAddress,
        marked_at: Timestamp,
        validated_at: Option<Timestamp>,
    ) -> AttendanceRecord {
        self.last_id += 1;
        let record = AttendanceRecord {
            id: AttendanceId::new(self.last_id),
            class_id: class_id.clone(),
            student: student.clone(),
            marked_at: Some(marked_at),
            validated: validated_at.is_some(),
            validated_at,
            badge_ref: None,
            badge_claimed_at: None,
        };
        self.attendance.insert(record.id, record.clone());
        record
    }
}

/// An in-memory implementation of every store trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`StoreError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of attendance records held.
    pub fn attendance_count(&self) -> usize {
        self.lock().map(|s| s.attendance.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store is unavailable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("null store mutex poisoned".to_string()))
    }
}

impl IdentityStore for NullStore {
    fn get_identity(&self, address: &IdentityAddress) -> Result<Identity, StoreError> {
        self.lock()?
            .identities
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("identity {}", address)))
    }

    fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.identities.contains_key(identity.address()) {
            return Err(StoreError::Duplicate(format!(
                "identity {}",
                identity.address()
            )));
        }
        state
            .identities
            .insert(identity.address().clone(), identity.clone());
        Ok(())
    }

    fn put_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.lock()?
            .identities
            .insert(identity.address().clone(), identity.clone());
        Ok(())
    }

    fn delete_identity(&self, address: &IdentityAddress) -> Result<(), StoreError> {
        self.lock()?
            .identities
            .remove(address)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("identity {}", address)))
    }

    fn identity_exists(&self, address: &IdentityAddress) -> Result<bool, StoreError> {
        Ok(self.lock()?.identities.contains_key(address))
    }

    fn iter_identities(&self) -> Result<Vec<Identity>, StoreError> {
        Ok(self.lock()?.identities.values().cloned().collect())
    }
}

impl ClassStore for NullStore {
    fn get_class(&self, class_id: &ClassId) -> Result<ClassRecord, StoreError> {
        self.lock()?
            .classes
            .get(class_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("class {}", class_id)))
    }

    fn insert_class(&self, record: &ClassRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.classes.contains_key(&record.class_id) {
            return Err(StoreError::Duplicate(format!("class {}", record.class_id)));
        }
        state.classes.insert(record.class_id.clone(), record.clone());
        Ok(())
    }

    fn update_details(
        &self,
        class_id: &ClassId,
        title: &str,
        description: Option<String>,
        now: Timestamp,
    ) -> Result<ClassRecord, StoreError> {
        let mut state = self.lock()?;
        let class = state
            .classes
            .get_mut(class_id)
            .ok_or_else(|| StoreError::NotFound(format!("class {}", class_id)))?;
        class.title = title.to_string();
        class.description = description;
        class.updated_at = now;
        Ok(class.clone())
    }

    fn delete_class(&self, class_id: &ClassId) -> Result<(), StoreError> {
        self.lock()?
            .classes
            .remove(class_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("class {}", class_id)))
    }

    fn add_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let class = state
            .classes
            .get_mut(class_id)
            .ok_or_else(|| StoreError::NotFound(format!("class {}", class_id)))?;
        let changed = class.students.insert(student.clone());
        if changed {
            class.updated_at = now;
        }
        Ok(changed)
    }

    fn remove_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let class = state
            .classes
            .get_mut(class_id)
            .ok_or_else(|| StoreError::NotFound(format!("class {}", class_id)))?;
        let changed = class.students.remove(student);
        if changed {
            class.updated_at = now;
        }
        Ok(changed)
    }

    fn iter_classes(&self) -> Result<Vec<ClassRecord>, StoreError> {
        Ok(self.lock()?.classes.values().cloned().collect())
    }
}

impl AttendanceStore for NullStore {
    fn insert_marked(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        marked_at: Timestamp,
    ) -> Result<AttendanceRecord, StoreError> {
        Ok(self.lock()?.insert_new(class_id, student, marked_at, None))
    }

    fn get_attendance(&self, id: AttendanceId) -> Result<AttendanceRecord, StoreError> {
        self.lock()?
            .attendance
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("attendance {}", id)))
    }

    fn latest_pending(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .rev()
            .find(|r| {
                !r.validated
                    && r.class_id == *class_id
                    && r.student == *student
                    && r.marked_at.map(|ts| ts.day()) == Some(day)
            })
            .cloned())
    }

    fn validated_on_day(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.lock()?.day_holder(class_id, student, day))
    }

    fn commit_validation(
        &self,
        id: AttendanceId,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("attendance {}", id)))?;
        let day = validated_at.day();

        if let Some(existing) = state.day_holder(&record.class_id, &record.student, day) {
            return Ok(CommitOutcome::AlreadyValidated(existing));
        }
        if record.validated {
            return Err(StoreError::InvalidState(format!(
                "attendance {} is already validated",
                id
            )));
        }

        let mut record = record;
        record.validated = true;
        record.validated_at = Some(validated_at);
        state.validated_days.insert(
            (record.class_id.clone(), record.student.clone(), day),
            record.id,
        );
        state.attendance.insert(record.id, record.clone());
        Ok(CommitOutcome::Committed(record))
    }

    fn insert_validated(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError> {
        let mut state = self.lock()?;
        let day = validated_at.day();
        if let Some(existing) = state.day_holder(class_id, student, day) {
            return Ok(CommitOutcome::AlreadyValidated(existing));
        }
        let record = state.insert_new(class_id, student, validated_at, Some(validated_at));
        state
            .validated_days
            .insert((class_id.clone(), student.clone(), day), record.id);
        Ok(CommitOutcome::Committed(record))
    }

    fn claim_badge(
        &self,
        id: AttendanceId,
        now: Timestamp,
        stale_after_secs: u64,
    ) -> Result<BadgeClaim, StoreError> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("attendance {}", id)))?;
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
        }
        record.badge_claimed_at = Some(now);
        Ok(BadgeClaim::Claimed(record.clone()))
    }

    fn release_badge_claim(&self, id: AttendanceId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("attendance {}", id)))?;
        record.badge_claimed_at = None;
        Ok(())
    }

    fn set_badge_ref(
        &self,
        id: AttendanceId,
        badge_ref: &BadgeRef,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut state = self.lock()?;
        let record = state
            .attendance
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("attendance {}", id)))?;
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
        Ok(record.clone())
    }

    fn class_attendance(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .filter(|r| r.class_id == *class_id)
            .cloned()
            .collect())
    }

    fn student_attendance(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .filter(|r| r.student == *student)
            .cloned()
            .collect())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock()?.meta.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.meta.get(key).cloned())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        Ok(0)
    }

    fn set_schema_version(&self, _version: u32) -> Result<(), StoreError> {
        Ok(())
    }
}
