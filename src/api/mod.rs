pub mod handlers;
pub mod state;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(services: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let storage_root = settings.storage.root.clone();
    let app_state = AppState::new(services, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Management routes; authorization happens upstream of this
        // service, so they are mounted without an auth layer here.
        .nest("/api", management_routes())

        // Guest-facing routes, addressed by invitation slug + QR identifier
        .nest("/pay", payment_routes())
        .nest("/wishes", wish_routes())

        // Gateway callback endpoint (must stay reachable without auth)
        .route("/payments/notification", post(handlers::payments::notification))

        // Rendered QR artifacts
        .nest_service("/storage", ServeDir::new(storage_root))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn management_routes() -> Router<AppState> {
    Router::new()
        .route("/invitations", post(handlers::invitations::create))
        .route("/invitations", get(handlers::invitations::list))
        .route("/invitations/:id", get(handlers::invitations::get))
        .route("/invitations/:id", delete(handlers::invitations::delete))
        .route("/invitations/:id/stats", get(handlers::invitations::stats))
        .route("/invitations/:id/gifts", get(handlers::invitations::gifts))
        .route("/invitations/:id/guests", get(handlers::guests::list))
        .route("/invitations/:id/guests", post(handlers::guests::create))
        .route("/invitations/:id/guests/:guest_id", put(handlers::guests::update))
        .route(
            "/invitations/:id/guests/:guest_id",
            delete(handlers::guests::delete),
        )
        .route(
            "/invitations/:id/guests/:guest_id/regenerate-qr",
            post(handlers::guests::regenerate_qr),
        )
        .route("/checkin/:qr_identifier", post(handlers::guests::check_in))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/:slug/:qr_identifier", post(handlers::payments::create))
        .route("/:slug/:qr_identifier/status", get(handlers::payments::status))
}

fn wish_routes() -> Router<AppState> {
    Router::new()
        .route("/:slug", get(handlers::wishes::list))
        .route("/:slug/:qr_identifier", post(handlers::wishes::submit))
}
