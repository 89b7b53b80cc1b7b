//! The Validation Workflow: Marked → Validated, then a best-effort badge.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use poap_badge::{BadgeError, BadgeRequest, SharedBadgeGateway};
use poap_registry::EnrollmentRegistry;
use poap_store::{AttendanceRecord, BadgeClaim};
use poap_types::{AttendanceId, BadgeRef, ClassId, Clock, DayIndex, IdentityAddress, Timestamp};

use crate::{AttendanceError, AttendanceLedger, ValidationPolicy};

/// Upper bound on one badge issuance call.
pub const DEFAULT_BADGE_TIMEOUT: Duration = Duration::from_secs(15);

/// What became of the badge request that follows a committed validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BadgeStatus {
    Issued { badge_ref: BadgeRef },
    /// The issuer refused; retrying the same request will not help.
    Failed { reason: String },
    /// The issuer was unreachable or too slow; a retry may succeed.
    Pending { reason: String },
}

impl BadgeStatus {
    pub fn badge_ref(&self) -> Option<&BadgeRef> {
        match self {
            BadgeStatus::Issued { badge_ref } => Some(badge_ref),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BadgeStatus::Issued { .. } => "issued",
            BadgeStatus::Failed { .. } => "failed",
            BadgeStatus::Pending { .. } => "pending",
        }
    }
}

/// A committed validation. `badge` is reported separately; the record is
/// validated whatever it says.
#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub record: AttendanceRecord,
    pub validated_at: Timestamp,
    pub badge: BadgeStatus,
}

pub struct ValidationWorkflow {
    ledger: Arc<AttendanceLedger>,
    registry: Arc<EnrollmentRegistry>,
    badges: SharedBadgeGateway,
    clock: Arc<dyn Clock>,
    policy: ValidationPolicy,
    badge_timeout: Duration,
}

impl ValidationWorkflow {
    pub fn new(
        ledger: Arc<AttendanceLedger>,
        badges: SharedBadgeGateway,
        clock: Arc<dyn Clock>,
        policy: ValidationPolicy,
    ) -> Self {
        let registry = ledger.registry.clone();
        Self {
            ledger,
            registry,
            badges,
            clock,
            policy,
            badge_timeout: DEFAULT_BADGE_TIMEOUT,
        }
    }

    pub fn with_badge_timeout(mut self, timeout: Duration) -> Self {
        self.badge_timeout = timeout;
        self
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn ledger(&self) -> &Arc<AttendanceLedger> {
        &self.ledger
    }

    /// Validate today's attendance of `student` in `class_id`.
    pub async fn validate(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        student: &IdentityAddress,
    ) -> Result<ValidationOutcome, AttendanceError> {
        self.validate_on(class_id, lecturer, student, None).await
    }

    /// Validate attendance for `day`, or for today when `day` is `None`.
    ///
    /// Only [`ValidationPolicy::LecturerInitiated`] accepts a day, and never
    /// one after today. A past day is recorded at that day's midnight, so
    /// the once-per-day rule applies to the day named.
    ///
    /// The once-per-day check and the commit happen atomically in the store;
    /// the early check below only avoids work on the common rejection path.
    pub async fn validate_on(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        student: &IdentityAddress,
        day: Option<DayIndex>,
    ) -> Result<ValidationOutcome, AttendanceError> {
        if !self.registry.is_owner(class_id, lecturer)? {
            return Err(AttendanceError::Forbidden(format!(
                "{lecturer} does not lecture class {class_id}"
            )));
        }
        if !self.registry.is_enrolled(class_id, student)? {
            return Err(AttendanceError::Forbidden(format!(
                "{student} is not enrolled in class {class_id}"
            )));
        }
        let class = self.registry.get_class(class_id)?;
        let now = self.clock.now();
        let at = self.validation_time(day, now)?;

        self.reject_if_validated_today(class_id, student, at)?;

        let record = match self.policy {
            ValidationPolicy::RequireMark => {
                let pending = match self.ledger.find_pending_for_validation(class_id, student, at) {
                    Ok(pending) => pending,
                    Err(AttendanceError::NotFound(what)) => {
                        // A concurrent validation may have consumed the mark.
                        self.reject_if_validated_today(class_id, student, at)?;
                        return Err(AttendanceError::NotFound(what));
                    }
                    Err(e) => return Err(e),
                };
                self.ledger.record_validation(pending.id, at)?
            }
            ValidationPolicy::LecturerInitiated => {
                self.ledger.record_direct_validation(class_id, student, at)?
            }
        };

        tracing::info!(
            id = %record.id,
            class_id = %class_id,
            student = %student,
            lecturer = %lecturer,
            policy = %self.policy,
            day = %at.day(),
            "attendance validated"
        );

        let badge = match self.ledger.claim_badge(record.id, now, self.claim_ttl_secs()) {
            Ok(BadgeClaim::Claimed(_)) => self.issue_badge(&record, &class.title).await,
            Ok(BadgeClaim::Issued(badge_ref)) => BadgeStatus::Issued { badge_ref },
            Ok(BadgeClaim::InFlight { .. }) => BadgeStatus::Pending {
                reason: "badge issuance already in progress".into(),
            },
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "could not reserve badge issuance");
                BadgeStatus::Pending {
                    reason: format!("could not reserve badge issuance: {e}"),
                }
            }
        };
        Ok(ValidationOutcome {
            validated_at: at,
            record: self.reload(record),
            badge,
        })
    }

    /// Request a badge again for a validated record that has none.
    pub async fn retry_badge(
        &self,
        id: AttendanceId,
        lecturer: &IdentityAddress,
    ) -> Result<ValidationOutcome, AttendanceError> {
        let record = self.ledger.get(id)?;
        let class = self.registry.get_class(&record.class_id)?;
        if !class.is_owned_by(lecturer) {
            return Err(AttendanceError::Forbidden(format!(
                "{lecturer} does not lecture class {}",
                record.class_id
            )));
        }
        let Some(validated_at) = record.validated_at.filter(|_| record.validated) else {
            return Err(AttendanceError::InvalidState(format!(
                "attendance {id} is not validated"
            )));
        };

        let now = self.clock.now();
        match self.ledger.claim_badge(id, now, self.claim_ttl_secs())? {
            BadgeClaim::Claimed(_) => {}
            BadgeClaim::Issued(badge_ref) => {
                return Err(AttendanceError::Conflict(format!(
                    "attendance {id} already has badge {badge_ref}"
                )));
            }
            BadgeClaim::InFlight { since } => {
                return Err(AttendanceError::Conflict(format!(
                    "badge issuance for attendance {id} in progress since {since}"
                )));
            }
        }

        let badge = self.issue_badge(&record, &class.title).await;
        Ok(ValidationOutcome {
            validated_at,
            record: self.reload(record),
            badge,
        })
    }

    fn validation_time(
        &self,
        day: Option<DayIndex>,
        now: Timestamp,
    ) -> Result<Timestamp, AttendanceError> {
        let Some(day) = day else {
            return Ok(now);
        };
        if self.policy == ValidationPolicy::RequireMark {
            return Err(AttendanceError::InvalidInput(
                "a date is only accepted for lecturer-initiated validation".into(),
            ));
        }
        let today = now.day();
        if day > today {
            return Err(AttendanceError::InvalidInput(format!(
                "cannot validate attendance for a future {day}"
            )));
        }
        Ok(if day == today { now } else { day.start() })
    }

    /// A claim this old is presumed abandoned by a crashed or stuck caller.
    fn claim_ttl_secs(&self) -> u64 {
        self.badge_timeout.as_secs().saturating_mul(2).max(1)
    }

    fn reject_if_validated_today(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<(), AttendanceError> {
        match self.ledger.find_validated_today(class_id, student, now)? {
            Some(existing) => Err(AttendanceError::AlreadyValidated {
                attendance_id: existing.id,
                validated_at: existing.validated_at.unwrap_or(now),
            }),
            None => Ok(()),
        }
    }

    /// Runs after the commit and outside any storage transaction, with the
    /// record's badge claim held. Never returns an error: every failure
    /// becomes a [`BadgeStatus`].
    async fn issue_badge(&self, record: &AttendanceRecord, title: &str) -> BadgeStatus {
        let request = BadgeRequest::attendance(record.student.clone(), title);
        let result = tokio::time::timeout(self.badge_timeout, self.badges.issue_badge(&request)).await;

        let receipt = match result {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e @ BadgeError::Unavailable(_))) => {
                tracing::warn!(id = %record.id, error = %e, "badge issuance unavailable");
                self.release_claim(record.id);
                return BadgeStatus::Pending {
                    reason: e.to_string(),
                };
            }
            Ok(Err(e)) => {
                tracing::warn!(id = %record.id, error = %e, "badge issuance failed");
                self.release_claim(record.id);
                return BadgeStatus::Failed {
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                tracing::warn!(id = %record.id, timeout = ?self.badge_timeout, "badge issuance timed out");
                self.release_claim(record.id);
                return BadgeStatus::Pending {
                    reason: format!("badge issuer did not answer within {:?}", self.badge_timeout),
                };
            }
        };

        match self.ledger.attach_badge(record.id, &receipt.tx_ref) {
            Ok(stored) => BadgeStatus::Issued {
                badge_ref: stored.badge_ref.unwrap_or(receipt.tx_ref),
            },
            Err(e) => {
                tracing::error!(id = %record.id, tx_ref = %receipt.tx_ref, error = %e, "failed to store badge reference");
                // Whatever the store holds is the badge of record.
                match self.ledger.get(record.id).map(|r| r.badge_ref) {
                    Ok(Some(badge_ref)) => BadgeStatus::Issued { badge_ref },
                    _ => {
                        self.release_claim(record.id);
                        BadgeStatus::Pending {
                            reason: format!(
                                "badge {} was issued but its reference could not be stored",
                                receipt.tx_ref
                            ),
                        }
                    }
                }
            }
        }
    }

    fn release_claim(&self, id: AttendanceId) {
        if let Err(e) = self.ledger.release_badge_claim(id) {
            tracing::warn!(id = %id, error = %e, "failed to release badge claim");
        }
    }

    fn reload(&self, record: AttendanceRecord) -> AttendanceRecord {
        match self.ledger.get(record.id) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(id = %record.id, error = %e, "failed to re-read attendance record");
                record
            }
        }
    }
}
