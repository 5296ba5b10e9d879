use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{
        AttendanceStatus, CreateGuestRequest, Guest, GuestChanges, GuestStatistics, NewGuest,
        UpdateGuestRequest,
    },
    error::{AppError, Result},
    phone,
    qr::QrCodeService,
    repository::GuestRepository,
};

/// The minting loop already checks existence, so losing the insert race
/// more than a couple of times in a row means something is wrong.
const MAX_CREATE_ATTEMPTS: usize = 5;

pub struct GuestService {
    guests: Arc<dyn GuestRepository>,
    qr: Arc<QrCodeService>,
}

impl GuestService {
    pub fn new(guests: Arc<dyn GuestRepository>, qr: Arc<QrCodeService>) -> Self {
        Self { guests, qr }
    }

    /// Create a guest: normalize the contact, mint the QR identity,
    /// render the artifact, then insert. The guest row is only ever
    /// written complete. The unique constraint on the identifier column
    /// is the authority; a conflicting insert re-mints and retries.
    pub async fn create_guest(
        &self,
        mut request: CreateGuestRequest,
        invitation_id: i64,
        user_id: i64,
    ) -> Result<Guest> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Guest name must not be empty".to_string(),
            ));
        }

        request.contact = normalize_contact(request.contact);

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let qr_data = self.qr.issue(&request.name).await?;
            let artifact = qr_data.artifact.clone();

            let new_guest = NewGuest {
                qr_identifier: qr_data.identifier,
                name: request.name.clone(),
                gender: request.gender,
                category: request.category.clone(),
                contact: request.contact.clone(),
                address: request.address.clone(),
                qr_artifact: qr_data.artifact,
                invitation_id,
                user_id,
            };

            match self.guests.create(new_guest).await {
                Ok(guest) => return Ok(guest),
                Err(AppError::Conflict(_)) => {
                    // Lost an insert race on the identifier. Drop the
                    // orphaned artifact and mint a fresh identity.
                    self.qr.delete_artifact(&artifact).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "Guest creation failed {} identifier races in a row",
            MAX_CREATE_ATTEMPTS
        )))
    }

    /// Update guest details. A name change regenerates the QR identity
    /// exactly once; any other change leaves identifier and artifact
    /// untouched.
    pub async fn update_guest(&self, id: i64, mut request: UpdateGuestRequest) -> Result<Guest> {
        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation(
                    "Guest name must not be empty".to_string(),
                ));
            }
        }

        let existing = self
            .guests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

        request.contact = normalize_contact(request.contact);

        let mut changes = GuestChanges {
            name: request.name.clone(),
            gender: request.gender,
            category: request.category,
            contact: request.contact,
            address: request.address,
            attendance_status: request.attendance_status,
            invitation_status: request.invitation_status,
            ..Default::default()
        };

        if let Some(new_name) = &request.name {
            if *new_name != existing.name {
                let qr_data = self.qr.regenerate(&existing.qr_artifact, new_name).await?;
                changes.qr_identifier = Some(qr_data.identifier);
                changes.qr_artifact = Some(qr_data.artifact);
            }
        }

        self.guests.update(id, changes).await
    }

    /// Delete a guest and its artifact. Artifact removal is best-effort;
    /// the row goes away regardless.
    pub async fn delete_guest(&self, id: i64) -> Result<()> {
        let existing = self
            .guests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

        self.qr.delete_artifact(&existing.qr_artifact).await;
        self.guests.delete(id).await
    }

    /// Re-mint the QR identity for an existing guest, e.g. to repair a
    /// pending artifact after a renderer outage.
    pub async fn regenerate_qr(&self, id: i64) -> Result<Guest> {
        let existing = self
            .guests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

        let qr_data = self
            .qr
            .regenerate(&existing.qr_artifact, &existing.name)
            .await?;

        self.guests
            .update(
                id,
                GuestChanges {
                    qr_identifier: Some(qr_data.identifier),
                    qr_artifact: Some(qr_data.artifact),
                    ..Default::default()
                },
            )
            .await
    }

    /// Resolve a scanned QR identifier and mark the guest attended.
    /// Scanning an already-attended guest is a no-op.
    pub async fn check_in(&self, qr_identifier: &str) -> Result<Guest> {
        let guest = self
            .guests
            .find_by_qr_identifier(qr_identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("Unknown QR code".to_string()))?;

        if guest.attendance_status == AttendanceStatus::Attended {
            return Ok(guest);
        }

        tracing::info!("Checking in guest {} ({})", guest.id, guest.name);

        self.guests
            .update(
                guest.id,
                GuestChanges {
                    attendance_status: Some(AttendanceStatus::Attended),
                    arrival_time: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn statistics(&self, invitation_id: i64) -> Result<GuestStatistics> {
        self.guests.statistics(invitation_id).await
    }
}

/// Best-effort phone canonicalization: a value that fails to normalize
/// is kept raw rather than rejected.
fn normalize_contact(contact: Option<String>) -> Option<String> {
    contact.map(|raw| phone::normalize(&raw).unwrap_or(raw))
}
