use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::state::AppState,
    domain::{validate_wish_message, CreateWishRequest, NewWish, Wish},
    error::{AppError, Result},
};

pub async fn submit(
    State(state): State<AppState>,
    Path((slug, qr_identifier)): Path<(String, String)>,
    Json(request): Json<CreateWishRequest>,
) -> Result<(StatusCode, Json<Wish>)> {
    if let Some(reason) = validate_wish_message(&request.message) {
        return Err(AppError::Validation(reason.to_string()));
    }

    let invitation = state
        .services
        .invitation_repo
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let guest = state
        .services
        .guest_repo
        .find_by_qr_identifier(&qr_identifier)
        .await?
        .filter(|g| g.invitation_id == invitation.id)
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

    let wish = state
        .services
        .wish_repo
        .create(NewWish {
            guest_id: guest.id,
            invitation_id: invitation.id,
            message: request.message.trim().to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(wish)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Wish>>> {
    let invitation = state
        .services
        .invitation_repo
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let wishes = state
        .services
        .wish_repo
        .list_by_invitation(invitation.id)
        .await?;

    Ok(Json(wishes))
}
