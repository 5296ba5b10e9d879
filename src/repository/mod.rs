use async_trait::async_trait;
use crate::domain::*;
use crate::error::{AppError, Result};

pub mod invitation_repository;
pub mod guest_repository;
pub mod payment_repository;
pub mod gift_repository;
pub mod wish_repository;

pub use invitation_repository::SqliteInvitationRepository;
pub use guest_repository::SqliteGuestRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use gift_repository::SqliteGiftRepository;
pub use wish_repository::SqliteWishRepository;

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn create(&self, request: CreateInvitationRequest) -> Result<Invitation>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Invitation>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Invitation>>;
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Invitation>>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait GuestRepository: Send + Sync {
    /// Insert a fully-minted guest. A duplicate QR identifier surfaces as
    /// [`AppError::Conflict`] so the caller can re-mint and retry.
    async fn create(&self, guest: NewGuest) -> Result<Guest>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Guest>>;
    async fn find_by_qr_identifier(&self, qr_identifier: &str) -> Result<Option<Guest>>;
    /// Fetch a guest only if it belongs to the given invitation.
    async fn find_for_invitation(&self, invitation_id: i64, guest_id: i64)
        -> Result<Option<Guest>>;
    async fn qr_identifier_exists(&self, qr_identifier: &str) -> Result<bool>;
    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Guest>>;
    async fn update(&self, id: i64, changes: GuestChanges) -> Result<Guest>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn statistics(&self, invitation_id: i64) -> Result<GuestStatistics>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a pending payment. A duplicate order id surfaces as
    /// [`AppError::Conflict`].
    async fn create(&self, payment: NewPayment) -> Result<Payment>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>>;
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;
    /// Most recent payment attempt for a (guest, invitation) pair.
    async fn find_latest_for_pair(
        &self,
        guest_id: i64,
        invitation_id: i64,
    ) -> Result<Option<Payment>>;
    async fn record_notification(&self, id: i64, update: NotificationUpdate) -> Result<Payment>;
}

#[async_trait]
pub trait GiftRepository: Send + Sync {
    /// Insert a gift. A second gift for the same (guest, invitation) pair
    /// surfaces as [`AppError::Conflict`]; callers treat that as "already
    /// recorded".
    async fn create(&self, gift: NewGift) -> Result<Gift>;
    async fn find_by_pair(&self, guest_id: i64, invitation_id: i64) -> Result<Option<Gift>>;
    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Gift>>;
}

#[async_trait]
pub trait WishRepository: Send + Sync {
    async fn create(&self, wish: NewWish) -> Result<Wish>;
    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Wish>>;
}

/// Map an insert error, turning a violation of the named unique
/// constraint into a retryable [`AppError::Conflict`].
pub(crate) fn map_unique_violation(
    err: sqlx::Error,
    constraint: &str,
    conflict_message: &str,
) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.message().contains(constraint) => {
            AppError::Conflict(conflict_message.to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
