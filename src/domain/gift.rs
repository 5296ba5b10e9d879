use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A confirmed monetary contribution, derived once from a settled
/// payment. At most one gift exists per (guest, invitation) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gift {
    pub id: i64,
    pub guest_id: i64,
    pub invitation_id: i64,
    pub amount: i64,
    pub method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGift {
    pub guest_id: i64,
    pub invitation_id: i64,
    pub amount: i64,
    pub method: String,
    pub notes: Option<String>,
}
