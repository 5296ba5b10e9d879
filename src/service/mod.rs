pub mod guest_service;
pub mod payment_service;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::MidtransConfig;
use crate::payments::SnapGateway;
use crate::qr::QrCodeService;
use crate::repository::*;
use crate::storage::ContentStore;

pub use guest_service::GuestService;
pub use payment_service::{InitiateOutcome, PaymentService, PaymentStatusReport};

pub struct ServiceContext {
    pub invitation_repo: Arc<dyn InvitationRepository>,
    pub guest_repo: Arc<dyn GuestRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub gift_repo: Arc<dyn GiftRepository>,
    pub wish_repo: Arc<dyn WishRepository>,
    pub qr_service: Arc<QrCodeService>,
    pub guest_service: Arc<GuestService>,
    pub payment_service: Arc<PaymentService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        content_store: Arc<dyn ContentStore>,
        gateway: Arc<dyn SnapGateway>,
        midtrans: &MidtransConfig,
    ) -> Self {
        let invitation_repo: Arc<dyn InvitationRepository> =
            Arc::new(SqliteInvitationRepository::new(db_pool.clone()));
        let guest_repo: Arc<dyn GuestRepository> =
            Arc::new(SqliteGuestRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> =
            Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let gift_repo: Arc<dyn GiftRepository> =
            Arc::new(SqliteGiftRepository::new(db_pool.clone()));
        let wish_repo: Arc<dyn WishRepository> =
            Arc::new(SqliteWishRepository::new(db_pool.clone()));

        let qr_service = Arc::new(QrCodeService::new(guest_repo.clone(), content_store));
        let guest_service = Arc::new(GuestService::new(guest_repo.clone(), qr_service.clone()));
        let payment_service = Arc::new(PaymentService::new(
            payment_repo.clone(),
            gift_repo.clone(),
            gateway,
            midtrans,
        ));

        Self {
            invitation_repo,
            guest_repo,
            payment_repo,
            gift_repo,
            wish_repo,
            qr_service,
            guest_service,
            payment_service,
            db_pool,
        }
    }
}
