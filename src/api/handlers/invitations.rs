use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    domain::{CreateInvitationRequest, Gift, GuestStatistics, Invitation},
    error::{AppError, Result},
};

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>)> {
    if request.wedding_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Wedding name must not be empty".to_string(),
        ));
    }

    let invitation = state.services.invitation_repo.create(request).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    user_id: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Invitation>>> {
    let invitations = state
        .services
        .invitation_repo
        .list_by_user(params.user_id)
        .await?;
    Ok(Json(invitations))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Invitation>> {
    let invitation = state
        .services
        .invitation_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;
    Ok(Json(invitation))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state
        .services
        .invitation_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    state.services.invitation_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<GuestStatistics>> {
    state
        .services
        .invitation_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let stats = state.services.guest_service.statistics(id).await?;
    Ok(Json(stats))
}

pub async fn gifts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Gift>>> {
    state
        .services
        .invitation_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let gifts = state
        .services
        .payment_service
        .gifts_for_invitation(id)
        .await?;
    Ok(Json(gifts))
}
