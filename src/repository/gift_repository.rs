use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Gift, NewGift},
    error::{AppError, Result},
    repository::{map_unique_violation, GiftRepository},
};

#[derive(FromRow)]
struct GiftRow {
    id: i64,
    guest_id: i64,
    invitation_id: i64,
    amount: i64,
    method: String,
    notes: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteGiftRepository {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, guest_id, invitation_id, amount, method, notes, created_at
    FROM gifts
"#;

impl SqliteGiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_gift(row: GiftRow) -> Gift {
        Gift {
            id: row.id,
            guest_id: row.guest_id,
            invitation_id: row.invitation_id,
            amount: row.amount,
            method: row.method,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        }
    }
}

#[async_trait]
impl GiftRepository for SqliteGiftRepository {
    async fn create(&self, gift: NewGift) -> Result<Gift> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO gifts (guest_id, invitation_id, amount, method, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(gift.guest_id)
        .bind(gift.invitation_id)
        .bind(gift.amount)
        .bind(&gift.method)
        .bind(&gift.notes)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "gifts.guest_id, gifts.invitation_id",
                "Gift already recorded for this guest",
            )
        })?;

        let row = sqlx::query_as::<_, GiftRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(result.last_insert_rowid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_gift)
            .ok_or_else(|| AppError::Database("Failed to retrieve created gift".to_string()))
    }

    async fn find_by_pair(&self, guest_id: i64, invitation_id: i64) -> Result<Option<Gift>> {
        let row = sqlx::query_as::<_, GiftRow>(&format!(
            "{} WHERE guest_id = ? AND invitation_id = ?",
            SELECT_COLUMNS
        ))
        .bind(guest_id)
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_gift))
    }

    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Gift>> {
        let rows = sqlx::query_as::<_, GiftRow>(&format!(
            "{} WHERE invitation_id = ? ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_gift).collect())
    }
}
