use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BadgeError {
    /// The issuer could not be reached, timed out, or failed on its side.
    /// Issuance may succeed on a later retry.
    #[error("badge issuer unavailable: {0}")]
    Unavailable(String),

    /// The issuer refused the request.
    #[error("badge issuer rejected the request: {0}")]
    Rejected(String),

    #[error("badge client configuration error: {0}")]
    Config(String),
}

impl BadgeError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BadgeError::Unavailable(_))
    }
}
