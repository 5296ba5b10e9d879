use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub guest_id: i64,
    pub invitation_id: i64,
    /// Unique order identifier, `WED-<invitation>-<guest>-<unix-ts>`.
    pub order_id: String,
    pub payment_type: Option<String>,
    /// Gross amount in rupiah.
    pub gross_amount: i64,
    pub transaction_status: TransactionStatus,
    pub payment_status: PaymentStatus,
    /// Snap session token handed to the gateway's payment popup.
    pub snap_token: Option<String>,
    /// Raw gateway notification payload, kept for audit.
    pub gateway_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway-side transaction state. `settlement` is terminal; unknown
/// states coming off the wire are preserved verbatim rather than
/// rejected, since the gateway vocabulary grows over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Settlement,
    Deny,
    Cancel,
    Expire,
    Refund,
    #[serde(untagged)]
    Other(String),
}

impl TransactionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => TransactionStatus::Pending,
            "settlement" => TransactionStatus::Settlement,
            "deny" => TransactionStatus::Deny,
            "cancel" => TransactionStatus::Cancel,
            "expire" => TransactionStatus::Expire,
            "refund" => TransactionStatus::Refund,
            other => TransactionStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Refund => "refund",
            TransactionStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, TransactionStatus::Settlement)
    }
}

/// Derived two-state view used by the management screens: a payment is a
/// success once settled, pending in every other case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
}

impl PaymentStatus {
    pub fn from_transaction(status: &TransactionStatus) -> Self {
        if status.is_settled() {
            PaymentStatus::Success
        } else {
            PaymentStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
        }
    }
}

/// Insert model for a freshly initiated payment; both statuses start
/// pending and only the notification path moves them.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub guest_id: i64,
    pub invitation_id: i64,
    pub order_id: String,
    pub gross_amount: i64,
    pub snap_token: String,
}

/// State carried over from a verified gateway notification.
#[derive(Debug, Clone)]
pub struct NotificationUpdate {
    pub transaction_status: TransactionStatus,
    pub payment_type: Option<String>,
    pub payment_status: PaymentStatus,
    pub raw_payload: serde_json::Value,
}
