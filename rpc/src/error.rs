//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use poap_attendance::AttendanceError;
use poap_identity::IdentityError;
use poap_registry::RegistryError;
use poap_types::{Timestamp, TypeError};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("attendance already validated today at {validated_at}")]
    AlreadyValidated { validated_at: Timestamp },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) | Self::AlreadyValidated { .. } => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::AlreadyValidated { validated_at } => json!({
                "message": "Attendance already validated for this student today",
                "validatedAt": validated_at.as_secs(),
            }),
            // Internal details stay in the log.
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                json!({ "message": "internal server error" })
            }
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::InvalidRequest(msg) => json!({ "message": msg }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TypeError> for RpcError {
    fn from(e: TypeError) -> Self {
        RpcError::InvalidRequest(e.to_string())
    }
}

impl From<IdentityError> for RpcError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound(address) => RpcError::NotFound(format!("no account for {address}")),
            IdentityError::Forbidden(msg) => RpcError::Forbidden(msg),
            IdentityError::Conflict(msg) => RpcError::Conflict(msg),
            IdentityError::InvalidInput(msg) => RpcError::InvalidRequest(msg),
            IdentityError::InvalidSignature(msg) | IdentityError::Unauthorized(msg) => {
                RpcError::Unauthorized(msg)
            }
            other @ (IdentityError::Token(_) | IdentityError::Store(_)) => {
                RpcError::Internal(other.to_string())
            }
        }
    }
}

impl From<RegistryError> for RpcError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(msg) => RpcError::NotFound(msg),
            RegistryError::Forbidden(msg) => RpcError::Forbidden(msg),
            RegistryError::Conflict(msg) => RpcError::Conflict(msg),
            RegistryError::InvalidInput(msg) => RpcError::InvalidRequest(msg),
            RegistryError::Store(e) => RpcError::Internal(e.to_string()),
        }
    }
}

impl From<AttendanceError> for RpcError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::NotFound(msg) => RpcError::NotFound(msg),
            AttendanceError::Forbidden(msg) => RpcError::Forbidden(msg),
            AttendanceError::AlreadyValidated { validated_at, .. } => {
                RpcError::AlreadyValidated { validated_at }
            }
            AttendanceError::InvalidInput(msg) => RpcError::InvalidRequest(msg),
            AttendanceError::Conflict(msg) => RpcError::Conflict(msg),
            other @ (AttendanceError::InvalidState(_) | AttendanceError::Store(_)) => {
                RpcError::Internal(other.to_string())
            }
        }
    }
}
