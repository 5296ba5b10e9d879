use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    domain::{Guest, Invitation},
    error::{AppError, Result},
    service::{InitiateOutcome, PaymentStatusReport},
};

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default = "default_amount")]
    amount: i64,
}

fn default_amount() -> i64 {
    1000
}

/// Resolve the (invitation, guest) pair a public payment URL points at.
async fn resolve_pair(
    state: &AppState,
    slug: &str,
    qr_identifier: &str,
) -> Result<(Invitation, Guest)> {
    let invitation = state
        .services
        .invitation_repo
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    let guest = state
        .services
        .guest_repo
        .find_by_qr_identifier(qr_identifier)
        .await?
        .filter(|g| g.invitation_id == invitation.id)
        .ok_or_else(|| AppError::NotFound("Guest not found".to_string()))?;

    Ok((invitation, guest))
}

pub async fn create(
    State(state): State<AppState>,
    Path((slug, qr_identifier)): Path<(String, String)>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<Value>> {
    let (invitation, guest) = resolve_pair(&state, &slug, &qr_identifier).await?;

    let outcome = state
        .services
        .payment_service
        .initiate(&guest, &invitation, request.amount)
        .await?;

    let body = match outcome {
        InitiateOutcome::AlreadyPaid { message } => json!({
            "success": false,
            "already_paid": true,
            "message": message,
        }),
        InitiateOutcome::Resumed { order_id, snap_token } => json!({
            "success": true,
            "snap_token": snap_token,
            "order_id": order_id,
            "reused": true,
            "message": "Resuming your pending payment. Please finish it.",
        }),
        InitiateOutcome::Created { order_id, snap_token } => json!({
            "success": true,
            "snap_token": snap_token,
            "order_id": order_id,
        }),
    };

    Ok(Json(body))
}

pub async fn status(
    State(state): State<AppState>,
    Path((slug, qr_identifier)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let (invitation, guest) = resolve_pair(&state, &slug, &qr_identifier).await?;

    let report = state
        .services
        .payment_service
        .status(&guest, &invitation)
        .await?;

    let body = match report {
        PaymentStatusReport::NoPayment => json!({
            "has_payment": false,
            "message": "No payment yet",
        }),
        PaymentStatusReport::Existing {
            status,
            amount,
            message,
            order_id,
            snap_token,
            created_at,
        } => json!({
            "has_payment": true,
            "status": status.as_str(),
            "amount": amount,
            "message": message,
            "order_id": order_id,
            "snap_token": snap_token,
            "created_at": created_at.to_rfc3339(),
        }),
    };

    Ok(Json(body))
}

/// Gateway notification endpoint. Bad signatures and unknown orders are
/// discarded inside the service; the gateway always gets a 200 so it
/// stops retrying. Only a storage fault surfaces as an error.
pub async fn notification(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<&'static str> {
    state
        .services
        .payment_service
        .handle_notification(payload)
        .await?;

    Ok("OK")
}
