use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{
        AttendanceStatus, DeliveryStatus, Guest, GuestChanges, GuestGender, GuestStatistics,
        NewGuest,
    },
    error::{AppError, Result},
    repository::{map_unique_violation, GuestRepository},
};

#[derive(FromRow)]
struct GuestRow {
    id: i64,
    qr_identifier: String,
    name: String,
    gender: String,
    category: Option<String>,
    contact: Option<String>,
    address: Option<String>,
    qr_artifact: String,
    attendance_status: String,
    invitation_status: String,
    arrival_time: Option<NaiveDateTime>,
    invitation_id: i64,
    user_id: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteGuestRepository {
    pool: SqlitePool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, qr_identifier, name, gender, category, contact, address,
           qr_artifact, attendance_status, invitation_status, arrival_time,
           invitation_id, user_id, created_at, updated_at
    FROM guests
"#;

impl SqliteGuestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_guest(row: GuestRow) -> Result<Guest> {
        Ok(Guest {
            id: row.id,
            qr_identifier: row.qr_identifier,
            name: row.name,
            gender: Self::parse_gender(&row.gender)?,
            category: row.category,
            contact: row.contact,
            address: row.address,
            qr_artifact: row.qr_artifact,
            attendance_status: Self::parse_attendance(&row.attendance_status)?,
            invitation_status: Self::parse_delivery(&row.invitation_status)?,
            arrival_time: row
                .arrival_time
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            invitation_id: row.invitation_id,
            user_id: row.user_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_gender(s: &str) -> Result<GuestGender> {
        match s {
            "male" => Ok(GuestGender::Male),
            "female" => Ok(GuestGender::Female),
            _ => Err(AppError::Database(format!("Invalid guest gender: {}", s))),
        }
    }

    fn parse_attendance(s: &str) -> Result<AttendanceStatus> {
        match s {
            "-" => Ok(AttendanceStatus::NotYetResponded),
            "confirmed" => Ok(AttendanceStatus::Confirmed),
            "attended" => Ok(AttendanceStatus::Attended),
            _ => Err(AppError::Database(format!(
                "Invalid attendance status: {}",
                s
            ))),
        }
    }

    fn parse_delivery(s: &str) -> Result<DeliveryStatus> {
        match s {
            "-" => Ok(DeliveryStatus::NotSent),
            "sent" => Ok(DeliveryStatus::Sent),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "opened" => Ok(DeliveryStatus::Opened),
            _ => Err(AppError::Database(format!(
                "Invalid invitation status: {}",
                s
            ))),
        }
    }
}

#[async_trait]
impl GuestRepository for SqliteGuestRepository {
    async fn create(&self, guest: NewGuest) -> Result<Guest> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO guests (
                qr_identifier, name, gender, category, contact, address,
                qr_artifact, attendance_status, invitation_status,
                invitation_id, user_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, '-', '-', ?, ?, ?, ?)
            "#,
        )
        .bind(&guest.qr_identifier)
        .bind(&guest.name)
        .bind(guest.gender.as_str())
        .bind(&guest.category)
        .bind(&guest.contact)
        .bind(&guest.address)
        .bind(&guest.qr_artifact)
        .bind(guest.invitation_id)
        .bind(guest.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "guests.qr_identifier", "QR identifier already exists")
        })?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created guest".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Guest>> {
        let row = sqlx::query_as::<_, GuestRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_guest).transpose()
    }

    async fn find_by_qr_identifier(&self, qr_identifier: &str) -> Result<Option<Guest>> {
        let row =
            sqlx::query_as::<_, GuestRow>(&format!("{} WHERE qr_identifier = ?", SELECT_COLUMNS))
                .bind(qr_identifier)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_guest).transpose()
    }

    async fn find_for_invitation(
        &self,
        invitation_id: i64,
        guest_id: i64,
    ) -> Result<Option<Guest>> {
        let row = sqlx::query_as::<_, GuestRow>(&format!(
            "{} WHERE id = ? AND invitation_id = ?",
            SELECT_COLUMNS
        ))
        .bind(guest_id)
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_guest).transpose()
    }

    async fn qr_identifier_exists(&self, qr_identifier: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM guests WHERE qr_identifier = ?",
        )
        .bind(qr_identifier)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn list_by_invitation(&self, invitation_id: i64) -> Result<Vec<Guest>> {
        let rows = sqlx::query_as::<_, GuestRow>(&format!(
            "{} WHERE invitation_id = ? ORDER BY name",
            SELECT_COLUMNS
        ))
        .bind(invitation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_guest).collect()
    }

    async fn update(&self, id: i64, changes: GuestChanges) -> Result<Guest> {
        let now = Utc::now().naive_utc();
        let gender_str = changes.gender.map(|g| g.as_str());
        let attendance_str = changes.attendance_status.map(|s| s.as_str());
        let delivery_str = changes.invitation_status.map(|s| s.as_str());
        let arrival_naive = changes.arrival_time.map(|dt| dt.naive_utc());

        sqlx::query(
            r#"
            UPDATE guests
            SET name = COALESCE(?, name),
                gender = COALESCE(?, gender),
                category = COALESCE(?, category),
                contact = COALESCE(?, contact),
                address = COALESCE(?, address),
                attendance_status = COALESCE(?, attendance_status),
                invitation_status = COALESCE(?, invitation_status),
                arrival_time = COALESCE(?, arrival_time),
                qr_identifier = COALESCE(?, qr_identifier),
                qr_artifact = COALESCE(?, qr_artifact),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&changes.name)
        .bind(gender_str)
        .bind(&changes.category)
        .bind(&changes.contact)
        .bind(&changes.address)
        .bind(attendance_str)
        .bind(delivery_str)
        .bind(arrival_naive)
        .bind(&changes.qr_identifier)
        .bind(&changes.qr_artifact)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated guest".to_string()))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM guests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn statistics(&self, invitation_id: i64) -> Result<GuestStatistics> {
        let (total, confirmed, attended) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(attendance_status = 'confirmed'), 0),
                   COALESCE(SUM(attendance_status = 'attended'), 0)
            FROM guests
            WHERE invitation_id = ?
            "#,
        )
        .bind(invitation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(GuestStatistics {
            total_guests: total,
            confirmed_guests: confirmed,
            attended_guests: attended,
            awaiting_guests: total - confirmed - attended,
        })
    }
}
