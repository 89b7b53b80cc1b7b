//! HTTP client for the badge mint service.
//!
//! Contract:
//! - `GET {endpoint}/health` answers 2xx while the issuer is up.
//! - `POST {endpoint}/badges` with a JSON [`BadgeRequest`] answers
//!   `{"txRef": "..."}` on success.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;

use poap_types::BadgeRef;

use crate::{BadgeError, BadgeReceipt, BadgeRequest};

/// Default timeout for mint requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintResponse {
    tx_ref: String,
}

/// Client for one mint endpoint.
///
/// Constructed explicitly and shared by handle. It starts disconnected;
/// [`MintClient::connect`] health-checks the issuer and only then are mint calls sent.
pub struct MintClient {
    endpoint: String,
    http_client: reqwest::Client,
    connected: AtomicBool,
}

impl MintClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BadgeError> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(BadgeError::Config(format!(
                "badge endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| BadgeError::Config(e.to_string()))?;
        Ok(Self {
            endpoint,
            http_client,
            connected: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Health-check the issuer and mark the client connected on success.
    pub async fn connect(&self) -> Result<(), BadgeError> {
        self.health_check().await?;
        self.connected.store(true, Ordering::Release);
        tracing::info!(endpoint = %self.endpoint, "badge issuer connected");
        Ok(())
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// `GET {endpoint}/health`. Does not change the connected flag.
    pub async fn health_check(&self) -> Result<(), BadgeError> {
        let url = format!("{}/health", self.endpoint);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(BadgeError::Unavailable(format!(
                "health check returned HTTP status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// `POST {endpoint}/badges`.
    ///
    /// 4xx answers are [`BadgeError::Rejected`]; 5xx answers, transport
    /// failures, and timeouts are [`BadgeError::Unavailable`].
    pub async fn mint(&self, request: &BadgeRequest) -> Result<BadgeReceipt, BadgeError> {
        if !self.is_connected() {
            return Err(BadgeError::Unavailable(
                "mint client is not connected".to_string(),
            ));
        }

        let url = format!("{}/badges", self.endpoint);
        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(BadgeError::Rejected(format!("HTTP status {status}: {body}")));
        }
        if !status.is_success() {
            return Err(BadgeError::Unavailable(format!("HTTP status {status}")));
        }

        let parsed: MintResponse = response.json().await.map_err(|e| {
            BadgeError::Unavailable(format!("failed to parse mint response: {e}"))
        })?;
        if parsed.tx_ref.trim().is_empty() {
            return Err(BadgeError::Unavailable(
                "mint response carried an empty transaction reference".to_string(),
            ));
        }
        Ok(BadgeReceipt {
            tx_ref: BadgeRef::new(parsed.tx_ref),
        })
    }
}

fn map_send_error(e: reqwest::Error) -> BadgeError {
    if e.is_timeout() {
        BadgeError::Unavailable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        BadgeError::Unavailable(format!("connection failed: {e}"))
    } else {
        BadgeError::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use poap_types::IdentityAddress;

    async fn spawn_issuer(mint_status: StatusCode) -> String {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(
                "/badges",
                post(move |Json(req): Json<serde_json::Value>| async move {
                    let body = serde_json::json!({ "txRef": format!("0xtx-{}", req["title"].as_str().unwrap_or("")) });
                    (mint_status, Json(body))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request() -> BadgeRequest {
        BadgeRequest::attendance(IdentityAddress::from_bytes(&[7; 20]), "CS101")
    }

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(matches!(
            MintClient::new("ftp://issuer", DEFAULT_TIMEOUT),
            Err(BadgeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn mint_requires_connect() {
        let endpoint = spawn_issuer(StatusCode::OK).await;
        let client = MintClient::new(&endpoint, DEFAULT_TIMEOUT).unwrap();
        assert!(matches!(
            client.mint(&request()).await,
            Err(BadgeError::Unavailable(_))
        ));

        client.connect().await.unwrap();
        let receipt = client.mint(&request()).await.unwrap();
        assert_eq!(receipt.tx_ref.as_str(), "0xtx-CS101");
    }

    #[tokio::test]
    async fn client_error_is_rejected() {
        let endpoint = spawn_issuer(StatusCode::UNPROCESSABLE_ENTITY).await;
        let client = MintClient::new(&endpoint, DEFAULT_TIMEOUT).unwrap();
        client.connect().await.unwrap();
        assert!(matches!(
            client.mint(&request()).await,
            Err(BadgeError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let endpoint = spawn_issuer(StatusCode::BAD_GATEWAY).await;
        let client = MintClient::new(&endpoint, DEFAULT_TIMEOUT).unwrap();
        client.connect().await.unwrap();
        let err = client.mint(&request()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn unreachable_issuer_fails_connect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = MintClient::new(&format!("http://{addr}/"), Duration::from_secs(2)).unwrap();
        assert!(matches!(client.connect().await, Err(BadgeError::Unavailable(_))));
        assert!(!client.is_connected());
    }
}
