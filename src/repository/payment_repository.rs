use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{NewPayment, NotificationUpdate, Payment, PaymentStatus, TransactionStatus},
    error::{AppError, Result},
    repository::{map_unique_violation, PaymentRepository},
};

#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    guest_id: i64,
    invitation_id: i64,
    order_id: String,
    payment_type: Option<String>,
    gross_amount: i64,
    transaction_status: String,
    payment_status: String,
    snap_token: Option<String>,
    gateway_response: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, guest_id, invitation_id, order_id, payment_type,
           gross_amount, transaction_status, payment_status, snap_token,
           gateway_response, created_at, updated_at
    FROM payments
"#;

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        let gateway_response = row
            .gateway_response
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AppError::Database(format!("Invalid stored payload: {}", e)))
            })
            .transpose()?;

        Ok(Payment {
            id: row.id,
            guest_id: row.guest_id,
            invitation_id: row.invitation_id,
            order_id: row.order_id,
            payment_type: row.payment_type,
            gross_amount: row.gross_amount,
            transaction_status: TransactionStatus::parse(&row.transaction_status),
            payment_status: Self::parse_payment_status(&row.payment_status)?,
            snap_token: row.snap_token,
            gateway_response,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
        }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                guest_id, invitation_id, order_id, gross_amount,
                transaction_status, payment_status, snap_token,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, 'pending', 'pending', ?, ?, ?)
            "#,
        )
        .bind(payment.guest_id)
        .bind(payment.invitation_id)
        .bind(&payment.order_id)
        .bind(payment.gross_amount)
        .bind(&payment.snap_token)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "payments.order_id", "Order id already exists"))?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created payment".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let row =
            sqlx::query_as::<_, PaymentRow>(&format!("{} WHERE order_id = ?", SELECT_COLUMNS))
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_latest_for_pair(
        &self,
        guest_id: i64,
        invitation_id: i64,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "{} WHERE guest_id = ? AND invitation_id = ? ORDER BY id DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(guest_id)
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn record_notification(&self, id: i64, update: NotificationUpdate) -> Result<Payment> {
        let now = Utc::now().naive_utc();
        let raw = serde_json::to_string(&update.raw_payload)
            .map_err(|e| AppError::Internal(format!("Failed to serialize payload: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE payments
            SET transaction_status = ?,
                payment_type = COALESCE(?, payment_type),
                payment_status = ?,
                gateway_response = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.transaction_status.as_str())
        .bind(&update.payment_type)
        .bind(update.payment_status.as_str())
        .bind(&raw)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated payment".to_string()))
    }
}
