use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    config::MidtransConfig,
    domain::{
        Gift, Guest, Invitation, NewGift, NewPayment, NotificationUpdate, PaymentStatus,
        TransactionStatus,
    },
    error::{AppError, Result},
    payments::{signature_matches, GatewayNotification, SnapGateway, SnapRequest},
    repository::{GiftRepository, PaymentRepository},
};

/// Pending payments older than this are described as expired in status
/// reports. Advisory only: the stored row is never expired here, and
/// initiation keeps reusing it regardless of age.
const PENDING_FRESHNESS_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub enum InitiateOutcome {
    /// A settled payment already exists for the pair; nothing was
    /// created or mutated.
    AlreadyPaid { message: String },
    /// An outstanding pending payment was returned verbatim.
    Resumed { order_id: String, snap_token: String },
    Created { order_id: String, snap_token: String },
}

#[derive(Debug, Clone)]
pub enum PaymentStatusReport {
    NoPayment,
    Existing {
        status: TransactionStatus,
        amount: i64,
        message: String,
        order_id: String,
        snap_token: Option<String>,
        created_at: DateTime<Utc>,
    },
}

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    gifts: Arc<dyn GiftRepository>,
    gateway: Arc<dyn SnapGateway>,
    server_key: String,
    minimum_amount: i64,
    /// Serializes the check-then-create decision per (guest, invitation)
    /// pair so concurrent initiations cannot both insert a pending row.
    /// Entries are tiny and bounded by the guest roster.
    initiation_locks: Mutex<HashMap<(i64, i64), Arc<Mutex<()>>>>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gifts: Arc<dyn GiftRepository>,
        gateway: Arc<dyn SnapGateway>,
        config: &MidtransConfig,
    ) -> Self {
        Self {
            payments,
            gifts,
            gateway,
            server_key: config.server_key.clone().unwrap_or_default(),
            minimum_amount: config.minimum_gift_amount,
            initiation_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn pair_lock(&self, guest_id: i64, invitation_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.initiation_locks.lock().await;
        locks
            .entry((guest_id, invitation_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Initiate a gift payment for a guest. Settled pairs are refused,
    /// an outstanding pending payment is always reused unchanged, and
    /// only a terminal non-settlement state (or no payment at all) opens
    /// a fresh gateway session. Nothing is persisted when the gateway
    /// call fails.
    pub async fn initiate(
        &self,
        guest: &Guest,
        invitation: &Invitation,
        amount: i64,
    ) -> Result<InitiateOutcome> {
        if amount < self.minimum_amount {
            return Err(AppError::Validation(format!(
                "Minimum gift amount is Rp {}",
                self.minimum_amount
            )));
        }

        let lock = self.pair_lock(guest.id, invitation.id).await;
        let _guard = lock.lock().await;

        if let Some(payment) = self
            .payments
            .find_latest_for_pair(guest.id, invitation.id)
            .await?
        {
            if payment.transaction_status.is_settled() {
                return Ok(InitiateOutcome::AlreadyPaid {
                    message: format!(
                        "Thank you for your wedding gift to {} & {}. Your contribution means a lot!",
                        invitation.groom_name, invitation.bride_name
                    ),
                });
            }

            if payment.transaction_status == TransactionStatus::Pending {
                return Ok(InitiateOutcome::Resumed {
                    order_id: payment.order_id,
                    snap_token: payment.snap_token.unwrap_or_default(),
                });
            }
        }

        // Millisecond resolution keeps order ids unique even when a new
        // attempt follows an expired one within the same second.
        let order_id = format!(
            "WED-{}-{}-{}",
            invitation.id,
            guest.id,
            Utc::now().timestamp_millis()
        );

        let request = SnapRequest {
            order_id: order_id.clone(),
            gross_amount: amount,
            customer_name: guest.name.clone(),
            customer_phone: guest.contact.clone(),
            item_name: format!(
                "Wedding Gift for {} & {}",
                invitation.groom_name, invitation.bride_name
            ),
        };

        let snap_token = self.gateway.create_transaction(&request).await?;

        let payment = self
            .payments
            .create(NewPayment {
                guest_id: guest.id,
                invitation_id: invitation.id,
                order_id,
                gross_amount: amount,
                snap_token: snap_token.clone(),
            })
            .await?;

        tracing::info!(
            "Opened payment {} for guest {} on invitation {}",
            payment.order_id,
            guest.id,
            invitation.id
        );

        Ok(InitiateOutcome::Created {
            order_id: payment.order_id,
            snap_token,
        })
    }

    /// Read-only status report for the pair's most recent payment. The
    /// freshness window only shapes the message; no state changes here.
    pub async fn status(&self, guest: &Guest, invitation: &Invitation) -> Result<PaymentStatusReport> {
        let Some(payment) = self
            .payments
            .find_latest_for_pair(guest.id, invitation.id)
            .await?
        else {
            return Ok(PaymentStatusReport::NoPayment);
        };

        let minutes_since_created = (Utc::now() - payment.created_at).num_minutes();

        let message = match &payment.transaction_status {
            TransactionStatus::Settlement => {
                "Thank you for your gift, your contribution means a lot to us!".to_string()
            }
            TransactionStatus::Pending if minutes_since_created < PENDING_FRESHNESS_MINUTES => {
                "You have a pending payment. Please finish or resume it.".to_string()
            }
            TransactionStatus::Pending => {
                "The previous payment has expired. You can start a new one.".to_string()
            }
            _ => String::new(),
        };

        Ok(PaymentStatusReport::Existing {
            status: payment.transaction_status,
            amount: payment.gross_amount,
            message,
            order_id: payment.order_id,
            snap_token: payment.snap_token,
            created_at: payment.created_at,
        })
    }

    /// Apply an asynchronous gateway notification. A payload that fails
    /// the signature check (or parses badly, or names an unknown order)
    /// is logged and discarded without touching any state; the caller
    /// still acknowledges receipt so the gateway stops retrying. A
    /// settlement triggers idempotent gift recording, whose failure is
    /// logged and swallowed.
    pub async fn handle_notification(&self, payload: serde_json::Value) -> Result<()> {
        let notification: GatewayNotification = match serde_json::from_value(payload.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Discarding malformed gateway notification: {}", e);
                return Ok(());
            }
        };

        if !signature_matches(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
            &self.server_key,
            &notification.signature_key,
        ) {
            tracing::warn!(
                "Discarding gateway notification with invalid signature for order {}",
                notification.order_id
            );
            return Ok(());
        }

        let Some(payment) = self.payments.find_by_order_id(&notification.order_id).await? else {
            tracing::warn!(
                "Gateway notification for unknown order {}",
                notification.order_id
            );
            return Ok(());
        };

        let transaction_status = TransactionStatus::parse(&notification.transaction_status);
        let payment_status = PaymentStatus::from_transaction(&transaction_status);
        let settled = transaction_status.is_settled();

        let updated = self
            .payments
            .record_notification(
                payment.id,
                NotificationUpdate {
                    transaction_status,
                    payment_type: notification.payment_type,
                    payment_status,
                    raw_payload: payload,
                },
            )
            .await?;

        tracing::info!(
            "Payment {} moved to {}",
            updated.order_id,
            updated.transaction_status.as_str()
        );

        if settled {
            if let Err(e) = self.record_gift(&updated).await {
                tracing::error!(
                    "Failed to record gift for order {}: {}",
                    updated.order_id,
                    e
                );
            }
        }

        Ok(())
    }

    /// Create the gift derived from a settled payment, once. Redelivered
    /// settlements find the existing row (or lose the insert race to the
    /// unique constraint) and do nothing.
    async fn record_gift(&self, payment: &crate::domain::Payment) -> Result<()> {
        if self
            .gifts
            .find_by_pair(payment.guest_id, payment.invitation_id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        match self
            .gifts
            .create(NewGift {
                guest_id: payment.guest_id,
                invitation_id: payment.invitation_id,
                amount: payment.gross_amount,
                method: "Digital Payment".to_string(),
                notes: Some(format!("Paid via Midtrans - Order {}", payment.order_id)),
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn gifts_for_invitation(&self, invitation_id: i64) -> Result<Vec<Gift>> {
        self.gifts.list_by_invitation(invitation_id).await
    }
}
