//! The Attendance Ledger.

use std::cmp::Reverse;
use std::sync::Arc;

use poap_registry::EnrollmentRegistry;
use poap_store::{AttendanceRecord, BadgeClaim, CommitOutcome, SharedAttendanceStore};
use poap_types::{AttendanceId, BadgeRef, ClassId, IdentityAddress, Timestamp};

use crate::AttendanceError;

pub struct AttendanceLedger {
    store: SharedAttendanceStore,
    pub(crate) registry: Arc<EnrollmentRegistry>,
}

impl AttendanceLedger {
    pub fn new(store: SharedAttendanceStore, registry: Arc<EnrollmentRegistry>) -> Self {
        Self { store, registry }
    }

    /// Record a student's self-reported presence.
    ///
    /// Earlier unvalidated marks are kept; each call adds a record.
    pub fn mark_attendance(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        at: Timestamp,
    ) -> Result<AttendanceRecord, AttendanceError> {
        if !self.registry.is_enrolled(class_id, student)? {
            return Err(AttendanceError::Forbidden(format!(
                "{student} is not enrolled in class {class_id}"
            )));
        }
        let record = self.store.insert_marked(class_id, student, at)?;
        tracing::info!(id = %record.id, class_id = %class_id, student = %student, "attendance marked");
        Ok(record)
    }

    pub fn get(&self, id: AttendanceId) -> Result<AttendanceRecord, AttendanceError> {
        Ok(self.store.get_attendance(id)?)
    }

    /// The most recent unvalidated record the student marked on `today`'s
    /// UTC calendar day. Marks left over from earlier days do not count.
    pub fn find_pending_for_validation(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        today: Timestamp,
    ) -> Result<AttendanceRecord, AttendanceError> {
        self.store
            .latest_pending(class_id, student, today.day())?
            .ok_or_else(|| {
                AttendanceError::NotFound(format!(
                    "no attendance marked today by {student} in class {class_id}"
                ))
            })
    }

    /// The record validated on `today`'s UTC calendar day, if any.
    pub fn find_validated_today(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        today: Timestamp,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        Ok(self
            .store
            .validated_on_day(class_id, student, today.day())?)
    }

    /// Flip a marked record to validated.
    ///
    /// Fails with `AlreadyValidated` if the pair already holds today's slot
    /// and with `InvalidState` if this record was validated before.
    pub fn record_validation(
        &self,
        id: AttendanceId,
        validated_at: Timestamp,
    ) -> Result<AttendanceRecord, AttendanceError> {
        committed(self.store.commit_validation(id, validated_at)?)
    }

    /// Create a record that is validated on creation.
    pub fn record_direct_validation(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        validated_at: Timestamp,
    ) -> Result<AttendanceRecord, AttendanceError> {
        committed(self.store.insert_validated(class_id, student, validated_at)?)
    }

    /// Reserve badge issuance for a validated record. A claim older than
    /// `stale_after_secs` is treated as abandoned and taken over.
    pub fn claim_badge(
        &self,
        id: AttendanceId,
        now: Timestamp,
        stale_after_secs: u64,
    ) -> Result<BadgeClaim, AttendanceError> {
        Ok(self.store.claim_badge(id, now, stale_after_secs)?)
    }

    pub fn release_badge_claim(&self, id: AttendanceId) -> Result<(), AttendanceError> {
        Ok(self.store.release_badge_claim(id)?)
    }

    /// Store the reference of the badge issued for a validated record.
    pub fn attach_badge(
        &self,
        id: AttendanceId,
        badge_ref: &BadgeRef,
    ) -> Result<AttendanceRecord, AttendanceError> {
        Ok(self.store.set_badge_ref(id, badge_ref)?)
    }

    /// Records of a class, newest first. Only the class's lecturer and its
    /// enrolled students may read them.
    pub fn class_records(
        &self,
        class_id: &ClassId,
        viewer: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let class = self.registry.get_class(class_id)?;
        if !(class.is_owned_by(viewer) || class.has_student(viewer)) {
            return Err(AttendanceError::Forbidden(format!(
                "{viewer} may not view attendance for class {class_id}"
            )));
        }
        let mut records = self.store.class_attendance(class_id)?;
        newest_first(&mut records);
        Ok(records)
    }

    /// A student's own records across classes, newest first.
    pub fn student_records(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let mut records = self.store.student_attendance(student)?;
        newest_first(&mut records);
        Ok(records)
    }

    /// The student's records that carry an issued badge, newest first.
    pub fn student_badges(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let mut records = self.student_records(student)?;
        records.retain(|r| r.badge_ref.is_some());
        Ok(records)
    }

    pub fn has_class_records(&self, class_id: &ClassId) -> Result<bool, AttendanceError> {
        Ok(!self.store.class_attendance(class_id)?.is_empty())
    }

    pub fn has_student_records(&self, student: &IdentityAddress) -> Result<bool, AttendanceError> {
        Ok(!self.store.student_attendance(student)?.is_empty())
    }
}

fn committed(outcome: CommitOutcome) -> Result<AttendanceRecord, AttendanceError> {
    match outcome {
        CommitOutcome::Committed(record) => Ok(record),
        CommitOutcome::AlreadyValidated(existing) => Err(AttendanceError::AlreadyValidated {
            attendance_id: existing.id,
            validated_at: existing.validated_at.unwrap_or(Timestamp::EPOCH),
        }),
    }
}

/// Order by validation time, falling back to mark time; ties go to the
/// higher id.
pub(crate) fn newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by_key(|r| Reverse((r.last_activity(), r.id)));
}
