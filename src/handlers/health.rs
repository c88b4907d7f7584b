use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;
use std::sync::Arc;

/// Creates the router for liveness/readiness checks
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// Liveness plus a database round-trip.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "success": db_ok,
            "data": {
                "status": if db_ok { "ok" } else { "degraded" },
                "database": if db_ok { "up" } else { "down" },
            },
        })),
    )
}
