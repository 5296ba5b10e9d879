use clap::Parser;
use fake::faker::address::en::SecondaryAddress;
use fake::faker::name::en::Name;
use fake::Fake;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

use undangan::{
    config::Settings,
    domain::{CreateGuestRequest, CreateInvitationRequest, GuestGender, NewWish},
    payments::DisabledGateway,
    service::ServiceContext,
    storage::FsContentStore,
};

#[derive(Parser)]
#[command(about = "Seed the database with demo invitations and guests")]
struct Args {
    /// Number of guests to create per invitation
    #[arg(long, default_value_t = 25)]
    guests: usize,

    /// Number of invitations to create
    #[arg(long, default_value_t = 2)]
    invitations: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:undangan.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let settings = Settings::default();
    let content_store = Arc::new(FsContentStore::new(settings.storage.root.clone()));
    let services = ServiceContext::new(
        db_pool,
        content_store,
        Arc::new(DisabledGateway),
        &settings.midtrans,
    );

    let couples = [
        ("Rina", "Bayu"),
        ("Sari", "Dimas"),
        ("Ayu", "Fajar"),
        ("Laras", "Gilang"),
    ];

    for i in 0..args.invitations {
        let (bride, groom) = couples[i % couples.len()];
        let wedding_name = format!("{} & {} Wedding", bride, groom);

        println!("💍 Creating invitation: {}", wedding_name);
        let invitation = services
            .invitation_repo
            .create(CreateInvitationRequest {
                wedding_name: wedding_name.clone(),
                slug: Some(format!("{}-{}", i + 1, undangan::domain::slugify(&wedding_name))),
                groom_name: groom.to_string(),
                bride_name: bride.to_string(),
                wedding_date: chrono::NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
                wedding_time_start: "09:00".to_string(),
                wedding_time_end: "13:00".to_string(),
                wedding_venue: "Gedung Serbaguna Merdeka".to_string(),
                user_id: (i + 1) as i64,
            })
            .await?;

        println!("👥 Creating {} guests...", args.guests);
        for n in 0..args.guests {
            let name: String = Name().fake();
            let guest = services
                .guest_service
                .create_guest(
                    CreateGuestRequest {
                        name,
                        gender: if n % 2 == 0 {
                            GuestGender::Male
                        } else {
                            GuestGender::Female
                        },
                        category: Some(if n % 3 == 0 { "Family" } else { "Friends" }.to_string()),
                        contact: Some(format!("08{:010}", 1_200_000_000u64 + n as u64)),
                        address: Some(SecondaryAddress().fake::<String>()),
                    },
                    invitation.id,
                    invitation.user_id,
                )
                .await?;

            // A few guests leave a wish
            if n % 5 == 0 {
                services
                    .wish_repo
                    .create(NewWish {
                        guest_id: guest.id,
                        invitation_id: invitation.id,
                        message: format!(
                            "Congratulations {} & {}! Wishing you a lifetime of happiness.",
                            bride, groom
                        ),
                    })
                    .await?;
            }
        }
    }

    println!("✅ Seeding complete");
    Ok(())
}
