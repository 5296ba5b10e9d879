use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{NewWish, Wish},
    error::{AppError, Result},
    repository::WishRepository,
};

#[derive(FromRow)]
struct WishRow {
    id: i64,
    guest_id: i64,
    invitation_id: i64,
    message: String,
    created_at: NaiveDateTime,
}

pub struct SqliteWishRepository {
    pool: SqlitePool,
}

impl SqliteWishRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_wish(row: WishRow) -> Wish {
        Wish {
            id: row.id,
            guest_id: row.guest_id,
            invitation_id: row.invitation_id,
            message: row.message,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        }
    }
}

#[async_trait]
impl WishRepository for SqliteWishRepository {
    async fn create(&self, wish: NewWish) -> Result<Wish> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO wishes (guest_id, invitation_id, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(wish.guest_id)
        .bind(wish.invitation_id)
        .bind(&wish.message)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, WishRow>(
            r#"
            SELECT id, guest_id, invitation_id, message, created_at
            FROM wishes WHERE id = ?
            "#,
        )
        .bind(result.last_insert_rowid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_wish)
            .ok_or_else(|| AppError::Database("Failed to retrieve created wish".to_string()))
    }

    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Wish>> {
        let rows = sqlx::query_as::<_, WishRow>(
            r#"
            SELECT id, guest_id, invitation_id, message, created_at
            FROM wishes
            WHERE invitation_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(invitation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_wish).collect())
    }
}
