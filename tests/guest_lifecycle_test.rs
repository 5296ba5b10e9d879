use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use undangan::{
    config::MidtransConfig,
    domain::{AttendanceStatus, CreateGuestRequest, CreateInvitationRequest, GuestGender,
        UpdateGuestRequest, QR_PENDING},
    error::AppError,
    payments::FakeSnapGateway,
    service::ServiceContext,
    storage::{ContentStore, FsContentStore},
};

async fn test_context() -> anyhow::Result<(ServiceContext, Arc<FsContentStore>)> {
    // A single connection keeps the in-memory database shared across
    // all operations in the test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store_dir = std::env::temp_dir().join(format!("undangan-test-{}", nanoid::nanoid!(8)));
    let store = Arc::new(FsContentStore::new(store_dir));

    let context = ServiceContext::new(
        pool,
        store.clone(),
        Arc::new(FakeSnapGateway::new()),
        &MidtransConfig {
            server_key: Some("test-server-key".to_string()),
            client_key: None,
            is_production: false,
            enabled: true,
            minimum_gift_amount: 1000,
        },
    );

    Ok((context, store))
}

async fn seed_invitation(context: &ServiceContext) -> anyhow::Result<undangan::domain::Invitation> {
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
    Ok(invitation)
}

fn guest_request(name: &str) -> CreateGuestRequest {
    CreateGuestRequest {
        name: name.to_string(),
        gender: GuestGender::Female,
        category: Some("Family".to_string()),
        contact: Some("081234567890".to_string()),
        address: Some("Jl. Melati 5".to_string()),
    }
}

#[tokio::test]
async fn create_guest_mints_identity_and_normalizes_contact() -> anyhow::Result<()> {
    let (context, store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let guest = context
        .guest_service
        .create_guest(guest_request("Jane Doe"), invitation.id, invitation.user_id)
        .await?;

    // 10-char token, hyphen, slugged name
    assert_eq!(guest.qr_identifier.len(), 10 + 1 + "jane-doe".len());
    assert!(guest.qr_identifier.ends_with("-jane-doe"));

    // SVG artifact stored and readable
    assert!(guest.qr_artifact.starts_with("storage/qr/guests/"));
    assert!(guest.qr_artifact.ends_with(".svg"));
    let stored = store
        .get(guest.qr_artifact.strip_prefix("storage/").unwrap())
        .await?;
    assert!(String::from_utf8(stored)?.contains("<svg"));

    // Contact canonicalized to country-code form
    assert_eq!(guest.contact.as_deref(), Some("6281234567890"));
    assert_eq!(guest.attendance_status, AttendanceStatus::NotYetResponded);

    Ok(())
}

#[tokio::test]
async fn unnormalizable_contact_is_kept_raw() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let mut request = guest_request("Budi Santoso");
    request.contact = Some("call me maybe".to_string());

    let guest = context
        .guest_service
        .create_guest(request, invitation.id, invitation.user_id)
        .await?;

    assert_eq!(guest.contact.as_deref(), Some("call me maybe"));
    Ok(())
}

#[tokio::test]
async fn rename_regenerates_qr_identity_exactly_once() -> anyhow::Result<()> {
    let (context, store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let guest = context
        .guest_service
        .create_guest(guest_request("Jane Doe"), invitation.id, invitation.user_id)
        .await?;
    let old_identifier = guest.qr_identifier.clone();
    let old_artifact = guest.qr_artifact.clone();

    let renamed = context
        .guest_service
        .update_guest(
            guest.id,
            UpdateGuestRequest {
                name: Some("Jane Smith".to_string()),
                ..Default::default()
            },
        )
        .await?;

    assert_ne!(renamed.qr_identifier, old_identifier);
    assert_ne!(renamed.qr_artifact, old_artifact);
    assert!(renamed.qr_identifier.ends_with("-jane-smith"));

    // Old artifact was removed from the store
    assert!(store
        .get(old_artifact.strip_prefix("storage/").unwrap())
        .await
        .is_err());

    // Updating any other field leaves the identity untouched
    let updated = context
        .guest_service
        .update_guest(
            renamed.id,
            UpdateGuestRequest {
                address: Some("Jl. Kenanga 12".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.qr_identifier, renamed.qr_identifier);
    assert_eq!(updated.qr_artifact, renamed.qr_artifact);
    assert_eq!(updated.address.as_deref(), Some("Jl. Kenanga 12"));

    // Re-sending the same name is not a rename
    let same_name = context
        .guest_service
        .update_guest(
            renamed.id,
            UpdateGuestRequest {
                name: Some("Jane Smith".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(same_name.qr_identifier, renamed.qr_identifier);

    Ok(())
}

#[tokio::test]
async fn delete_guest_removes_row_and_artifact() -> anyhow::Result<()> {
    let (context, store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let guest = context
        .guest_service
        .create_guest(guest_request("Jane Doe"), invitation.id, invitation.user_id)
        .await?;
    let artifact_path = guest.qr_artifact.strip_prefix("storage/").unwrap().to_string();

    context.guest_service.delete_guest(guest.id).await?;

    assert!(context.guest_repo.find_by_id(guest.id).await?.is_none());
    assert!(store.get(&artifact_path).await.is_err());

    Ok(())
}

#[tokio::test]
async fn explicit_regenerate_repairs_identity() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let guest = context
        .guest_service
        .create_guest(guest_request("Jane Doe"), invitation.id, invitation.user_id)
        .await?;

    let regenerated = context.guest_service.regenerate_qr(guest.id).await?;
    assert_ne!(regenerated.qr_identifier, guest.qr_identifier);
    assert_ne!(regenerated.qr_artifact, QR_PENDING);
    assert!(regenerated.qr_identifier.ends_with("-jane-doe"));

    Ok(())
}

#[tokio::test]
async fn check_in_marks_attendance_once() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    let guest = context
        .guest_service
        .create_guest(guest_request("Jane Doe"), invitation.id, invitation.user_id)
        .await?;

    let checked_in = context
        .guest_service
        .check_in(&guest.qr_identifier)
        .await?;
    assert_eq!(checked_in.attendance_status, AttendanceStatus::Attended);
    assert!(checked_in.arrival_time.is_some());

    // Second scan is a no-op
    let again = context
        .guest_service
        .check_in(&guest.qr_identifier)
        .await?;
    assert_eq!(again.arrival_time, checked_in.arrival_time);

    // Unknown identifiers are a distinct not-found failure
    let missing = context.guest_service.check_in("nope-unknown").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn statistics_tally_attendance_states() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    let invitation = seed_invitation(&context).await?;

    for name in ["Jane Doe", "Budi Santoso", "Citra Lestari"] {
        context
            .guest_service
            .create_guest(guest_request(name), invitation.id, invitation.user_id)
            .await?;
    }

    let guests = context.guest_repo.list_by_invitation(invitation.id).await?;
    context
        .guest_service
        .update_guest(
            guests[0].id,
            UpdateGuestRequest {
                attendance_status: Some(AttendanceStatus::Confirmed),
                ..Default::default()
            },
        )
        .await?;
    context
        .guest_service
        .check_in(&guests[1].qr_identifier)
        .await?;

    let stats = context.guest_service.statistics(invitation.id).await?;
    assert_eq!(stats.total_guests, 3);
    assert_eq!(stats.confirmed_guests, 1);
    assert_eq!(stats.attended_guests, 1);
    assert_eq!(stats.awaiting_guests, 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_creates_mint_distinct_identifiers() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    let context = Arc::new(context);
    let invitation = seed_invitation(&context).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let context = context.clone();
        let invitation_id = invitation.id;
        let user_id = invitation.user_id;
        handles.push(tokio::spawn(async move {
            context
                .guest_service
                .create_guest(guest_request("Jane Doe"), invitation_id, user_id)
                .await
        }));
    }

    let mut identifiers = std::collections::HashSet::new();
    for handle in handles {
        let guest = handle.await??;
        assert!(identifiers.insert(guest.qr_identifier));
    }
    assert_eq!(identifiers.len(), 8);

    Ok(())
}

#[tokio::test]
async fn duplicate_invitation_slug_is_a_conflict() -> anyhow::Result<()> {
    let (context, _store) = test_context().await?;
    seed_invitation(&context).await?;

    let duplicate = seed_invitation(&context).await;
    assert!(matches!(duplicate, Err(e) if matches!(
        e.downcast_ref::<AppError>(),
        Some(AppError::Conflict(_))
    )));

    Ok(())
}
