use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{api::state::AppState, error::Result};

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "undangan",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>> {
    sqlx::query("SELECT 1")
        .execute(&state.services.db_pool)
        .await?;

    Ok(Json(json!({ "status": "ok" })))
}
