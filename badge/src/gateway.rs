//! The gateway seam between the validation workflow and the badge issuer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use poap_types::{BadgeRef, IdentityAddress, Timestamp};

use crate::{BadgeError, MintClient};

/// Role label stamped on badges issued for validated attendance.
pub const STUDENT_BADGE_ROLE: &str = "Student";

/// What to mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRequest {
    pub recipient: IdentityAddress,
    pub title: String,
    pub role: String,
    /// `None` means the badge never expires.
    pub expiry: Option<Timestamp>,
}

impl BadgeRequest {
    /// A non-expiring student badge for attending `title`.
    pub fn attendance(recipient: IdentityAddress, title: impl Into<String>) -> Self {
        Self {
            recipient,
            title: title.into(),
            role: STUDENT_BADGE_ROLE.to_string(),
            expiry: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BadgeReceipt {
    pub tx_ref: BadgeRef,
}

#[async_trait]
pub trait BadgeGateway: Send + Sync {
    async fn issue_badge(&self, request: &BadgeRequest) -> Result<BadgeReceipt, BadgeError>;
}

pub type SharedBadgeGateway = Arc<dyn BadgeGateway>;

/// Issues badges through a [`MintClient`].
pub struct HttpBadgeGateway {
    client: Arc<MintClient>,
}

impl HttpBadgeGateway {
    pub fn new(client: Arc<MintClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<MintClient> {
        &self.client
    }
}

#[async_trait]
impl BadgeGateway for HttpBadgeGateway {
    async fn issue_badge(&self, request: &BadgeRequest) -> Result<BadgeReceipt, BadgeError> {
        let receipt = self.client.mint(request).await?;
        tracing::info!(
            recipient = %request.recipient,
            title = %request.title,
            tx_ref = %receipt.tx_ref,
            "badge issued"
        );
        Ok(receipt)
    }
}

/// Used when no issuer endpoint is configured. Every call is `Unavailable`,
/// so validations still commit and report the badge as pending.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledBadgeGateway;

#[async_trait]
impl BadgeGateway for DisabledBadgeGateway {
    async fn issue_badge(&self, _request: &BadgeRequest) -> Result<BadgeReceipt, BadgeError> {
        Err(BadgeError::Unavailable("badge issuance disabled".to_string()))
    }
}
