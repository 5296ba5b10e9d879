use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    api::state::AppState,
    domain::{
        AttendanceStatus, CreateGuestRequest, DeliveryStatus, Guest, GuestGender,
        UpdateGuestRequest,
    },
    error::{AppError, Result},
    phone,
};

#[derive(Debug, Serialize)]
pub struct GuestDto {
    id: i64,
    qr_identifier: String,
    name: String,
    gender: GuestGender,
    category: Option<String>,
    contact: Option<String>,
    contact_display: Option<String>,
    address: Option<String>,
    qr_artifact: String,
    attendance_status: AttendanceStatus,
    invitation_status: DeliveryStatus,
    arrival_time: Option<String>,
    invitation_id: i64,
}

impl From<Guest> for GuestDto {
    fn from(guest: Guest) -> Self {
        Self {
            id: guest.id,
            qr_identifier: guest.qr_identifier,
            name: guest.name,
            gender: guest.gender,
            contact_display: guest.contact.as_deref().map(phone::format_display),
            contact: guest.contact,
            category: guest.category,
            address: guest.address,
            qr_artifact: guest.qr_artifact,
            attendance_status: guest.attendance_status,
            invitation_status: guest.invitation_status,
            arrival_time: guest.arrival_time.map(|dt| dt.to_rfc3339()),
            invitation_id: guest.invitation_id,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(invitation_id): Path<i64>,
) -> Result<Json<Vec<GuestDto>>> {
    let guests = state
        .services
        .guest_repo
        .list_by_invitation(invitation_id)
        .await?;
    Ok(Json(guests.into_iter().map(Into::into).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    Path(invitation_id): Path<i64>,
    Json(request): Json<CreateGuestRequest>,
) -> Result<(StatusCode, Json<GuestDto>)> {
    let invitation = state
        .services
        .invitation_repo
        .find_by_id(invitation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let guest = state
        .services
        .guest_service
        .create_guest(request, invitation.id, invitation.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(guest.into())))
}

pub async fn update(
    State(state): State<AppState>,
    Path((invitation_id, guest_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateGuestRequest>,
) -> Result<Json<GuestDto>> {
    let guest = state
        .services
        .guest_repo
        .find_for_invitation(invitation_id, guest_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

    let updated = state
        .services
        .guest_service
        .update_guest(guest.id, request)
        .await?;

    Ok(Json(updated.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((invitation_id, guest_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    let guest = state
        .services
        .guest_repo
        .find_for_invitation(invitation_id, guest_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

    state.services.guest_service.delete_guest(guest.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn regenerate_qr(
    State(state): State<AppState>,
    Path((invitation_id, guest_id)): Path<(i64, i64)>,
) -> Result<Json<GuestDto>> {
    let guest = state
        .services
        .guest_repo
        .find_for_invitation(invitation_id, guest_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

    let updated = state.services.guest_service.regenerate_qr(guest.id).await?;
    Ok(Json(updated.into()))
}

pub async fn check_in(
    State(state): State<AppState>,
    Path(qr_identifier): Path<String>,
) -> Result<Json<GuestDto>> {
    let guest = state.services.guest_service.check_in(&qr_identifier).await?;
    Ok(Json(guest.into()))
}
