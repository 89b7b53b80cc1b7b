//! Attendance Ledger and Validation Workflow.
//!
//! The [`AttendanceLedger`] owns attendance records and the once-per-day
//! validation rule. The [`ValidationWorkflow`] authorizes a lecturer's
//! validation against the enrollment registry, commits it through the
//! ledger, and then requests a badge. Badge failures never undo a commit.

pub mod error;
pub mod ledger;
pub mod policy;
pub mod stats;
pub mod workflow;

pub use error::AttendanceError;
pub use ledger::AttendanceLedger;
pub use policy::ValidationPolicy;
pub use stats::ClassAttendanceStats;
pub use workflow::{BadgeStatus, ValidationOutcome, ValidationWorkflow, DEFAULT_BADGE_TIMEOUT};
