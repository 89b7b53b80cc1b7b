//! Nullable badge issuer with scripted outcomes and recorded requests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use poap_badge::{BadgeError, BadgeGateway, BadgeReceipt, BadgeRequest};
use poap_types::BadgeRef;

/// A badge gateway that never leaves the process.
///
/// Outcomes queued with [`NullBadgeGateway::push_outcome`] are returned in
/// order. Once the queue is empty, calls fail with the error given to
/// [`NullBadgeGateway::failing`], or otherwise succeed with `0xbadge-<n>`.
#[derive(Default)]
pub struct NullBadgeGateway {
    outcomes: Mutex<VecDeque<Result<BadgeReceipt, BadgeError>>>,
    fallback_error: Option<BadgeError>,
    requests: Mutex<Vec<BadgeRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl NullBadgeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose every unscripted call fails with `error`.
    pub fn failing(error: BadgeError) -> Self {
        Self {
            fallback_error: Some(error),
            ..Self::default()
        }
    }

    pub fn push_outcome(&self, outcome: Result<BadgeReceipt, BadgeError>) {
        if let Ok(mut queue) = self.outcomes.lock() {
            queue.push_back(outcome);
        }
    }

    /// Sleep this long before answering each call.
    pub fn set_delay(&self, delay: Duration) {
        if let Ok(mut current) = self.delay.lock() {
            *current = Some(delay);
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<BadgeRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BadgeGateway for NullBadgeGateway {
    async fn issue_badge(&self, request: &BadgeRequest) -> Result<BadgeReceipt, BadgeError> {
        let call_number = match self.requests.lock() {
            Ok(mut requests) => {
                requests.push(request.clone());
                requests.len()
            }
            Err(_) => return Err(BadgeError::Unavailable("null gateway poisoned".into())),
        };

        let delay = self.delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.outcomes.lock().ok().and_then(|mut q| q.pop_front());
        match (scripted, &self.fallback_error) {
            (Some(outcome), _) => outcome,
            (None, Some(error)) => Err(error.clone()),
            (None, None) => Ok(BadgeReceipt {
                tx_ref: BadgeRef::new(format!("0xbadge-{call_number}")),
            }),
        }
    }
}
