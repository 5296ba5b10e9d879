use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference stored in place of an artifact path when both QR renderers
/// failed. Guests with this marker can be repaired via the explicit
/// regenerate operation.
pub const QR_PENDING: &str = "qr-pending";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    /// Opaque unique string encoded into the guest's QR code. Distinct
    /// from the numeric row id.
    pub qr_identifier: String,
    pub name: String,
    pub gender: GuestGender,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    /// Public path of the rendered QR image, or [`QR_PENDING`].
    pub qr_artifact: String,
    pub attendance_status: AttendanceStatus,
    pub invitation_status: DeliveryStatus,
    pub arrival_time: Option<DateTime<Utc>>,
    pub invitation_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestGender {
    Male,
    Female,
}

impl GuestGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestGender::Male => "male",
            GuestGender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Stored as `-`.
    #[serde(rename = "-")]
    NotYetResponded,
    Confirmed,
    Attended,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::NotYetResponded => "-",
            AttendanceStatus::Confirmed => "confirmed",
            AttendanceStatus::Attended => "attended",
        }
    }
}

/// Delivery state of the invitation message itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Stored as `-`.
    #[serde(rename = "-")]
    NotSent,
    Sent,
    Delivered,
    Opened,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::NotSent => "-",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Opened => "opened",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGuestRequest {
    pub name: String,
    pub gender: GuestGender,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    pub gender: Option<GuestGender>,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub attendance_status: Option<AttendanceStatus>,
    pub invitation_status: Option<DeliveryStatus>,
}

/// Fully-resolved insert model: contact already normalized, QR identity
/// already minted. No guest row is ever written without one.
#[derive(Debug, Clone)]
pub struct NewGuest {
    pub qr_identifier: String,
    pub name: String,
    pub gender: GuestGender,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub qr_artifact: String,
    pub invitation_id: i64,
    pub user_id: i64,
}

/// Column-level changes applied by the repository. The QR fields are only
/// populated by the lifecycle service when a rename forced regeneration.
#[derive(Debug, Clone, Default)]
pub struct GuestChanges {
    pub name: Option<String>,
    pub gender: Option<GuestGender>,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub attendance_status: Option<AttendanceStatus>,
    pub invitation_status: Option<DeliveryStatus>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub qr_identifier: Option<String>,
    pub qr_artifact: Option<String>,
}

/// Per-invitation attendance tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestStatistics {
    pub total_guests: i64,
    pub confirmed_guests: i64,
    pub attended_guests: i64,
    pub awaiting_guests: i64,
}
