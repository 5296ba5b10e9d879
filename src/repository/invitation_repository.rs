use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{slugify, CreateInvitationRequest, Invitation},
    error::{AppError, Result},
    repository::{map_unique_violation, InvitationRepository},
};

#[derive(FromRow)]
struct InvitationRow {
    id: i64,
    slug: String,
    wedding_name: String,
    groom_name: String,
    bride_name: String,
    wedding_date: NaiveDate,
    wedding_time_start: String,
    wedding_time_end: String,
    wedding_venue: String,
    user_id: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteInvitationRepository {
    pool: SqlitePool,
}

impl SqliteInvitationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_invitation(row: InvitationRow) -> Invitation {
        Invitation {
            id: row.id,
            slug: row.slug,
            wedding_name: row.wedding_name,
            groom_name: row.groom_name,
            bride_name: row.bride_name,
            wedding_date: row.wedding_date,
            wedding_time_start: row.wedding_time_start,
            wedding_time_end: row.wedding_time_end,
            wedding_venue: row.wedding_venue,
            user_id: row.user_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, slug, wedding_name, groom_name, bride_name,
           wedding_date, wedding_time_start, wedding_time_end,
           wedding_venue, user_id, created_at, updated_at
    FROM invitations
"#;

#[async_trait]
impl InvitationRepository for SqliteInvitationRepository {
    async fn create(&self, request: CreateInvitationRequest) -> Result<Invitation> {
        let slug = request
            .slug
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&request.wedding_name));
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO invitations (
                slug, wedding_name, groom_name, bride_name,
                wedding_date, wedding_time_start, wedding_time_end,
                wedding_venue, user_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&slug)
        .bind(&request.wedding_name)
        .bind(&request.groom_name)
        .bind(&request.bride_name)
        .bind(request.wedding_date)
        .bind(&request.wedding_time_start)
        .bind(&request.wedding_time_end)
        .bind(&request.wedding_venue)
        .bind(request.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "invitations.slug", "Invitation slug already exists")
        })?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created invitation".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Invitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_invitation))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Invitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!("{} WHERE slug = ?", SELECT_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(Self::row_to_invitation))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Self::row_to_invitation).collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM invitations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
