//! Parse and validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid identity address: {0}")]
    InvalidAddress(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid class id: {0}")]
    InvalidClassId(String),

    #[error("invalid attendance id: {0}")]
    InvalidAttendanceId(String),
}
