//! Attendance storage trait.
//!
//! The store owns the once-per-day validation rule: at most one validated
//! record may exist per `(class, student, UTC day)`. Both commit operations
//! check that rule and write the record as one atomic step, so concurrent
//! validations of the same key yield one [`CommitOutcome::Committed`] and
//! the rest [`CommitOutcome::AlreadyValidated`].

use crate::StoreError;
use poap_types::{AttendanceId, BadgeRef, ClassId, DayIndex, IdentityAddress, Timestamp};
use serde::{Deserialize, Serialize};

/// One student's attendance claim for one class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub class_id: ClassId,
    pub student: IdentityAddress,
    /// When the student self-reported. Records a lecturer created directly
    /// carry their validation time here.
    pub marked_at: Option<Timestamp>,
    pub validated: bool,
    pub validated_at: Option<Timestamp>,
    /// Transaction reference of the issued badge, once known.
    pub badge_ref: Option<BadgeRef>,
    /// Set while one caller is talking to the badge issuer for this record.
    pub badge_claimed_at: Option<Timestamp>,
}

impl AttendanceRecord {
    /// The day this record was validated on, if validated.
    pub fn validated_day(&self) -> Option<DayIndex> {
        self.validated_at.filter(|_| self.validated).map(|ts| ts.day())
    }

    /// Sort key for "newest first" listings: validation time, else mark time.
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.validated_at.or(self.marked_at)
    }
}

/// Result of an atomic check-and-commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The record is now validated.
    Committed(AttendanceRecord),
    /// Another record already holds the validation for that day; nothing was written.
    AlreadyValidated(AttendanceRecord),
}

/// Result of trying to reserve badge issuance for a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BadgeClaim {
    /// The caller now holds the claim and may call the issuer.
    Claimed(AttendanceRecord),
    /// A badge is already stored; nothing was written.
    Issued(BadgeRef),
    /// Another caller claimed the record at `since` and has not finished.
    InFlight { since: Timestamp },
}

/// Trait for attendance storage operations.
pub trait AttendanceStore {
    /// Create a new unvalidated record marked at `marked_at`, allocating its id.
    fn insert_marked(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        marked_at: Timestamp,
    ) -> Result<AttendanceRecord, StoreError>;

    fn get_attendance(&self, id: AttendanceId) -> Result<AttendanceRecord, StoreError>;

    /// Most recent unvalidated record for the pair marked on `day`.
    fn latest_pending(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// The validated record for the pair on `day`, if any.
    fn validated_on_day(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        day: DayIndex,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Atomically validate an existing record.
    ///
    /// Returns [`CommitOutcome::AlreadyValidated`] if the pair already has a
    /// validated record on `validated_at`'s day. Fails with
    /// [`StoreError::InvalidState`] if this record is already validated, and
    /// with [`StoreError::NotFound`] if it does not exist.
    fn commit_validation(
        &self,
        id: AttendanceId,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError>;

    /// Atomically create a record that is validated on creation
    /// (`marked_at = validated_at`), subject to the same once-per-day rule.
    fn insert_validated(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        validated_at: Timestamp,
    ) -> Result<CommitOutcome, StoreError>;

    /// Reserve badge issuance for a validated record.
    ///
    /// Succeeds when no badge is stored and no claim is held, or when the
    /// held claim is at least `stale_after_secs` old at `now`. Fails with
    /// [`StoreError::InvalidState`] on an unvalidated record.
    fn claim_badge(
        &self,
        id: AttendanceId,
        now: Timestamp,
        stale_after_secs: u64,
    ) -> Result<BadgeClaim, StoreError>;

    /// Drop a badge claim without storing a reference.
    fn release_badge_claim(&self, id: AttendanceId) -> Result<(), StoreError>;

    /// Attach the issued badge reference and clear any claim. Only allowed
    /// once, on a validated record; anything else fails with
    /// [`StoreError::InvalidState`].
    fn set_badge_ref(
        &self,
        id: AttendanceId,
        badge_ref: &BadgeRef,
    ) -> Result<AttendanceRecord, StoreError>;

    /// All records for a class, in id order.
    fn class_attendance(&self, class_id: &ClassId) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// All records for a student across classes, in id order.
    fn student_attendance(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}
