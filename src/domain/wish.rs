use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_WISH_LENGTH: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wish {
    pub id: i64,
    pub guest_id: i64,
    pub invitation_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWishRequest {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NewWish {
    pub guest_id: i64,
    pub invitation_id: i64,
    pub message: String,
}

/// Wishes are free-form but bounded; an empty or over-long message is a
/// validation failure.
pub fn validate_wish_message(message: &str) -> Option<&'static str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        Some("Wish message must not be empty")
    } else if trimmed.chars().count() > MAX_WISH_LENGTH {
        Some("Wish message must be at most 500 characters")
    } else {
        None
    }
}
