//! Shared state handed to every request handler.

use std::sync::Arc;

use poap_attendance::{AttendanceLedger, ValidationWorkflow};
use poap_identity::{IdentityResolver, SessionKeys, SignatureOracle};
use poap_registry::EnrollmentRegistry;
use poap_types::Clock;

use crate::RpcMetrics;

#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<IdentityResolver>,
    pub sessions: Arc<SessionKeys>,
    pub oracle: Arc<dyn SignatureOracle>,
    pub registry: Arc<EnrollmentRegistry>,
    pub ledger: Arc<AttendanceLedger>,
    pub workflow: Arc<ValidationWorkflow>,
    pub metrics: Arc<RpcMetrics>,
    pub clock: Arc<dyn Clock>,
    /// Adds `Secure` to the session cookie. Off for plain-HTTP development.
    pub secure_cookies: bool,
}
