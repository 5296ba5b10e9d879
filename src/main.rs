use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use undangan::{
    api,
    config::Settings,
    payments::{DisabledGateway, MidtransClient, SnapGateway},
    service::ServiceContext,
    storage::FsContentStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "undangan=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Undangan server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Content store for rendered QR artifacts
    let content_store = Arc::new(FsContentStore::new(settings.storage.root.clone()));

    // Initialize the Snap gateway if configured
    let gateway: Arc<dyn SnapGateway> = if settings.midtrans.enabled {
        if let Some(server_key) = settings.midtrans.server_key.clone() {
            tracing::info!(
                "Midtrans payment processing enabled ({})",
                if settings.midtrans.is_production {
                    "production"
                } else {
                    "sandbox"
                }
            );
            Arc::new(MidtransClient::new(
                server_key,
                settings.midtrans.is_production,
            )?)
        } else {
            tracing::warn!("Midtrans enabled but missing server key");
            Arc::new(DisabledGateway)
        }
    } else {
        tracing::info!("Midtrans payment processing disabled");
        Arc::new(DisabledGateway)
    };

    // Create service context
    let services = Arc::new(ServiceContext::new(
        db_pool,
        content_store,
        gateway,
        &settings.midtrans,
    ));

    let app = api::create_app(services, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
