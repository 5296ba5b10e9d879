use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use undangan::{
    config::MidtransConfig,
    domain::{
        CreateGuestRequest, CreateInvitationRequest, Guest, GuestGender, Invitation,
        PaymentStatus, TransactionStatus,
    },
    error::AppError,
    payments::{compute_signature, FakeSnapGateway},
    service::{InitiateOutcome, PaymentStatusReport, ServiceContext},
    storage::FsContentStore,
};

const SERVER_KEY: &str = "test-server-key";

struct Fixture {
    context: Arc<ServiceContext>,
    gateway: Arc<FakeSnapGateway>,
    pool: SqlitePool,
    invitation: Invitation,
    guest: Guest,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store_dir = std::env::temp_dir().join(format!("undangan-test-{}", nanoid::nanoid!(8)));
    let gateway = Arc::new(FakeSnapGateway::new());

    let context = Arc::new(ServiceContext::new(
        pool.clone(),
        Arc::new(FsContentStore::new(store_dir)),
        gateway.clone(),
        &MidtransConfig {
            server_key: Some(SERVER_KEY.to_string()),
            client_key: None,
            is_production: false,
            enabled: true,
            minimum_gift_amount: 1000,
        },
    ));

    let invitation = context
        .invitation_repo
        .create(CreateInvitationRequest {
            wedding_name: "Rina & Bayu Wedding".to_string(),
            slug: None,
            groom_name: "Bayu".to_string(),
            bride_name: "Rina".to_string(),
            wedding_date: chrono::NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
            wedding_time_start: "09:00".to_string(),
            wedding_time_end: "13:00".to_string(),
            wedding_venue: "Gedung Serbaguna Merdeka".to_string(),
            user_id: 1,
        })
        .await?;

    let guest = context
        .guest_service
        .create_guest(
            CreateGuestRequest {
                name: "Jane Doe".to_string(),
                gender: GuestGender::Female,
                category: Some("Family".to_string()),
                contact: Some("081234567890".to_string()),
                address: None,
            },
            invitation.id,
            invitation.user_id,
        )
        .await?;

    Ok(Fixture {
        context,
        gateway,
        pool,
        invitation,
        guest,
    })
}

/// A notification payload as the gateway would deliver it, with a valid
/// signature unless tampered with afterwards.
fn settlement_payload(order_id: &str, gross_amount: &str) -> serde_json::Value {
    let signature = compute_signature(order_id, "200", gross_amount, SERVER_KEY);
    serde_json::json!({
        "order_id": order_id,
        "status_code": "200",
        "gross_amount": gross_amount,
        "signature_key": signature,
        "transaction_status": "settlement",
        "payment_type": "qris",
    })
}

async fn payment_count(pool: &SqlitePool) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(pool)
        .await?)
}

async fn gift_count(pool: &SqlitePool) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM gifts")
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
async fn amount_below_minimum_is_rejected_without_state() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let result = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 500)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(payment_count(&fx.pool).await?, 0);
    assert_eq!(fx.gateway.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn pending_payment_is_reused_verbatim() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let first = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?;
    let InitiateOutcome::Created { order_id, snap_token } = first else {
        panic!("expected a fresh payment");
    };
    assert!(order_id.starts_with(&format!("WED-{}-{}-", fx.invitation.id, fx.guest.id)));

    let second = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 75000)
        .await?;
    let InitiateOutcome::Resumed {
        order_id: reused_order,
        snap_token: reused_token,
    } = second
    else {
        panic!("expected the pending payment to be reused");
    };

    assert_eq!(reused_order, order_id);
    assert_eq!(reused_token, snap_token);
    assert_eq!(payment_count(&fx.pool).await?, 1);
    assert_eq!(fx.gateway.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn stale_pending_payment_is_still_reused() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    // Age the payment well past the advisory freshness window.
    sqlx::query("UPDATE payments SET created_at = datetime('now', '-30 minutes')")
        .execute(&fx.pool)
        .await?;

    // The status report calls it expired...
    let report = fx
        .context
        .payment_service
        .status(&fx.guest, &fx.invitation)
        .await?;
    let PaymentStatusReport::Existing { message, .. } = report else {
        panic!("expected an existing payment");
    };
    assert!(message.contains("expired"));

    // ...but initiation still reuses it rather than expiring the row.
    let outcome = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?;
    assert!(matches!(
        outcome,
        InitiateOutcome::Resumed { order_id: reused, .. } if reused == order_id
    ));
    assert_eq!(payment_count(&fx.pool).await?, 1);

    Ok(())
}

#[tokio::test]
async fn settlement_callback_settles_payment_and_records_gift() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    fx.context
        .payment_service
        .handle_notification(settlement_payload(&order_id, "50000.00"))
        .await?;

    let payment = fx
        .context
        .payment_repo
        .find_by_order_id(&order_id)
        .await?
        .unwrap();
    assert_eq!(payment.transaction_status, TransactionStatus::Settlement);
    assert_eq!(payment.payment_status, PaymentStatus::Success);
    assert_eq!(payment.payment_type.as_deref(), Some("qris"));
    assert!(payment.gateway_response.is_some());

    let gift = fx
        .context
        .gift_repo
        .find_by_pair(fx.guest.id, fx.invitation.id)
        .await?
        .unwrap();
    assert_eq!(gift.amount, 50000);

    // Settled pairs refuse further initiation without a new row
    let blocked = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?;
    assert!(matches!(blocked, InitiateOutcome::AlreadyPaid { .. }));
    assert_eq!(payment_count(&fx.pool).await?, 1);

    Ok(())
}

#[tokio::test]
async fn redelivered_settlement_creates_exactly_one_gift() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    let payload = settlement_payload(&order_id, "50000.00");
    fx.context
        .payment_service
        .handle_notification(payload.clone())
        .await?;
    fx.context
        .payment_service
        .handle_notification(payload)
        .await?;

    assert_eq!(gift_count(&fx.pool).await?, 1);

    Ok(())
}

#[tokio::test]
async fn tampered_callback_is_discarded() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    // Signature computed over the real amount, payload claims another
    let mut payload = settlement_payload(&order_id, "50000.00");
    payload["gross_amount"] = serde_json::json!("999999.00");

    fx.context
        .payment_service
        .handle_notification(payload)
        .await?;

    let payment = fx
        .context
        .payment_repo
        .find_by_order_id(&order_id)
        .await?
        .unwrap();
    assert_eq!(payment.transaction_status, TransactionStatus::Pending);
    assert!(payment.gateway_response.is_none());
    assert_eq!(gift_count(&fx.pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn callback_for_unknown_order_is_acknowledged_and_ignored() -> anyhow::Result<()> {
    let fx = fixture().await?;

    fx.context
        .payment_service
        .handle_notification(settlement_payload("WED-9-9-123", "50000.00"))
        .await?;

    assert_eq!(payment_count(&fx.pool).await?, 0);
    assert_eq!(gift_count(&fx.pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn gateway_failure_persists_nothing() -> anyhow::Result<()> {
    let fx = fixture().await?;
    fx.gateway.set_failing(true);

    let result = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await;

    assert!(matches!(result, Err(AppError::External(_))));
    assert_eq!(payment_count(&fx.pool).await?, 0);

    // Recovery: the next attempt opens a fresh session
    fx.gateway.set_failing(false);
    let outcome = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?;
    assert!(matches!(outcome, InitiateOutcome::Created { .. }));

    Ok(())
}

#[tokio::test]
async fn expired_payment_allows_a_new_order() -> anyhow::Result<()> {
    let fx = fixture().await?;

    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    // Gateway reports the session expired (terminal, not settlement)
    let signature = compute_signature(&order_id, "407", "50000.00", SERVER_KEY);
    fx.context
        .payment_service
        .handle_notification(serde_json::json!({
            "order_id": order_id,
            "status_code": "407",
            "gross_amount": "50000.00",
            "signature_key": signature,
            "transaction_status": "expire",
        }))
        .await?;

    let outcome = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 60000)
        .await?;
    let InitiateOutcome::Created { order_id: new_order, .. } = outcome else {
        panic!("expected a fresh payment after expiry");
    };
    assert_ne!(new_order, order_id);
    assert_eq!(payment_count(&fx.pool).await?, 2);
    assert_eq!(gift_count(&fx.pool).await?, 0);

    Ok(())
}

#[tokio::test]
async fn end_to_end_gift_flow() -> anyhow::Result<()> {
    let fx = fixture().await?;

    // No payment yet
    let report = fx
        .context
        .payment_service
        .status(&fx.guest, &fx.invitation)
        .await?;
    assert!(matches!(report, PaymentStatusReport::NoPayment));

    // Initiate and settle
    let InitiateOutcome::Created { order_id, .. } = fx
        .context
        .payment_service
        .initiate(&fx.guest, &fx.invitation, 50000)
        .await?
    else {
        panic!("expected a fresh payment");
    };

    let parts: Vec<&str> = order_id.split('-').collect();
    assert_eq!(parts[0], "WED");
    assert_eq!(parts[1], fx.invitation.id.to_string());
    assert_eq!(parts[2], fx.guest.id.to_string());
    assert!(parts[3].parse::<i64>().is_ok());

    fx.context
        .payment_service
        .handle_notification(settlement_payload(&order_id, "50000.00"))
        .await?;

    let report = fx
        .context
        .payment_service
        .status(&fx.guest, &fx.invitation)
        .await?;
    let PaymentStatusReport::Existing { status, amount, message, .. } = report else {
        panic!("expected an existing payment");
    };
    assert_eq!(status, TransactionStatus::Settlement);
    assert_eq!(amount, 50000);
    assert!(message.contains("Thank you"));

    let gifts = fx
        .context
        .payment_service
        .gifts_for_invitation(fx.invitation.id)
        .await?;
    assert_eq!(gifts.len(), 1);
    assert_eq!(gifts[0].amount, 50000);

    Ok(())
}

#[tokio::test]
async fn notification_route_always_acknowledges() -> anyhow::Result<()> {
    use tower::util::ServiceExt;

    let fx = fixture().await?;
    let app = undangan::api::create_app(
        fx.context.clone(),
        Arc::new(undangan::config::Settings::default()),
    );

    // A payload that fails every check still gets a 200, so the gateway
    // stops retrying.
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/payments/notification")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"unexpected": "shape"}"#))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn concurrent_initiations_share_one_order() -> anyhow::Result<()> {
    let fx = fixture().await?;
    let context = fx.context.clone();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let context = context.clone();
        let guest = fx.guest.clone();
        let invitation = fx.invitation.clone();
        handles.push(tokio::spawn(async move {
            context.payment_service.initiate(&guest, &invitation, 50000).await
        }));
    }

    let mut order_ids = std::collections::HashSet::new();
    for handle in handles {
        match handle.await?? {
            InitiateOutcome::Created { order_id, .. }
            | InitiateOutcome::Resumed { order_id, .. } => {
                order_ids.insert(order_id);
            }
            InitiateOutcome::AlreadyPaid { .. } => panic!("nothing settled yet"),
        }
    }

    assert_eq!(order_ids.len(), 1);
    assert_eq!(payment_count(&fx.pool).await?, 1);
    assert_eq!(fx.gateway.calls(), 1);

    Ok(())
}
