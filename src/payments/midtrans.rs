//! Midtrans Snap gateway client and notification verification.
//!
//! `initiate` exchanges transaction metadata for a Snap session token via
//! the synchronous Snap API; settlement arrives later as an asynchronous
//! HTTP notification whose integrity is a sha512 digest over
//! `order_id + status_code + gross_amount + server_key`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

const SANDBOX_BASE_URL: &str = "https://app.sandbox.midtrans.com";
const PRODUCTION_BASE_URL: &str = "https://app.midtrans.com";

/// The Snap call is the only network round-trip on the synchronous
/// payment path, so it gets a hard client-side timeout.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Transaction metadata sent when opening a Snap session.
#[derive(Debug, Clone)]
pub struct SnapRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub item_name: String,
}

/// Asynchronous notification payload. Fields beyond these ride along in
/// the raw JSON, which is stored untouched for audit.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    /// Kept as the wire string; the signature is computed over the exact
    /// bytes the gateway sent, formatting included.
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    pub payment_type: Option<String>,
}

#[async_trait]
pub trait SnapGateway: Send + Sync {
    /// Open a Snap session and return its token. May fail or time out;
    /// callers persist nothing on failure.
    async fn create_transaction(&self, request: &SnapRequest) -> Result<String>;
}

pub struct MidtransClient {
    http: reqwest::Client,
    base_url: &'static str,
    server_key: String,
}

#[derive(Serialize)]
struct SnapTransactionBody<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: CustomerDetails<'a>,
    item_details: [ItemDetails<'a>; 1],
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Serialize)]
struct ItemDetails<'a> {
    id: &'a str,
    price: i64,
    quantity: u32,
    name: &'a str,
}

#[derive(Deserialize)]
struct SnapTokenResponse {
    token: String,
}

impl MidtransClient {
    pub fn new(server_key: String, is_production: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: if is_production {
                PRODUCTION_BASE_URL
            } else {
                SANDBOX_BASE_URL
            },
            server_key,
        })
    }
}

#[async_trait]
impl SnapGateway for MidtransClient {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<String> {
        let body = SnapTransactionBody {
            transaction_details: TransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.gross_amount,
            },
            customer_details: CustomerDetails {
                first_name: &request.customer_name,
                phone: request.customer_phone.as_deref(),
            },
            item_details: [ItemDetails {
                id: "wedding_gift",
                price: request.gross_amount,
                quantity: 1,
                name: &request.item_name,
            }],
        };

        let response = self
            .http
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Midtrans request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!(
                "Midtrans rejected transaction ({}): {}",
                status, detail
            )));
        }

        let parsed: SnapTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Midtrans response unreadable: {}", e)))?;

        Ok(parsed.token)
    }
}

/// Stands in when no gateway is configured; every initiation surfaces a
/// reported failure instead of a half-configured client.
pub struct DisabledGateway;

#[async_trait]
impl SnapGateway for DisabledGateway {
    async fn create_transaction(&self, _request: &SnapRequest) -> Result<String> {
        Err(AppError::External(
            "Payment gateway is not configured".to_string(),
        ))
    }
}

/// Recompute the notification digest and compare it to the payload's
/// signature in constant time.
pub fn signature_matches(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    signature_key: &str,
) -> bool {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    let expected = hex::encode(hasher.finalize());

    expected.as_bytes().ct_eq(signature_key.as_bytes()).into()
}

/// Compute the signature the gateway would send for a payload. Exposed
/// for fixtures; production code only ever verifies.
#[cfg(any(test, feature = "test-utils"))]
pub fn compute_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory gateway for tests: deterministic tokens, a switchable
/// failure mode, and a call counter.
#[cfg(any(test, feature = "test-utils"))]
pub struct FakeSnapGateway {
    calls: std::sync::atomic::AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl FakeSnapGateway {
    pub fn new() -> Self {
        Self {
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for FakeSnapGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl SnapGateway for FakeSnapGateway {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<String> {
        let n = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::External("Midtrans request failed: fake outage".to_string()));
        }
        Ok(format!("snap-token-{}-{}", request.order_id, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let sig = compute_signature("WED-1-2-1700000000", "200", "50000.00", "server-key");
        assert!(signature_matches(
            "WED-1-2-1700000000",
            "200",
            "50000.00",
            "server-key",
            &sig
        ));
    }

    #[test]
    fn tampered_amount_breaks_signature() {
        let sig = compute_signature("WED-1-2-1700000000", "200", "50000.00", "server-key");
        assert!(!signature_matches(
            "WED-1-2-1700000000",
            "200",
            "999999.00",
            "server-key",
            &sig
        ));
    }

    #[test]
    fn wrong_length_signature_is_rejected() {
        assert!(!signature_matches("a", "b", "c", "d", "too-short"));
    }

    #[tokio::test]
    async fn fake_gateway_counts_calls_and_fails_on_demand() {
        let gateway = FakeSnapGateway::new();
        let request = SnapRequest {
            order_id: "WED-1-1-1".to_string(),
            gross_amount: 50000,
            customer_name: "Jane".to_string(),
            customer_phone: None,
            item_name: "Wedding Gift".to_string(),
        };

        let token = gateway.create_transaction(&request).await.unwrap();
        assert!(token.starts_with("snap-token-WED-1-1-1"));

        gateway.set_failing(true);
        assert!(gateway.create_transaction(&request).await.is_err());
        assert_eq!(gateway.calls(), 2);
    }
}
