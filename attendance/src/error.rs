use poap_registry::RegistryError;
use poap_store::StoreError;
use poap_types::{AttendanceId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The pair already has a validated record today. Carries that record's
    /// validation time so callers can show it.
    #[error("attendance already validated today at {validated_at}")]
    AlreadyValidated {
        attendance_id: AttendanceId,
        validated_at: Timestamp,
    },

    /// The request collides with work already done or in progress.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AttendanceError::NotFound(what),
            StoreError::InvalidState(what) => AttendanceError::InvalidState(what),
            other => AttendanceError::Store(other),
        }
    }
}

impl From<RegistryError> for AttendanceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(what) => AttendanceError::NotFound(what),
            RegistryError::Forbidden(what) => AttendanceError::Forbidden(what),
            RegistryError::Conflict(what) => AttendanceError::Conflict(what),
            RegistryError::InvalidInput(what) => AttendanceError::InvalidInput(what),
            RegistryError::Store(e) => AttendanceError::Store(e),
        }
    }
}
