use crate::handlers::common::{map_service_error, success_response, success_with_message};
use crate::{
    auth::{gates, AuthRouterExt},
    entities::ContactStatus,
    errors::ApiError,
    services::ContactInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for the contact form
pub fn routes() -> Router<Arc<AppState>> {
    let public = Router::new().route("/", post(submit));

    let admin = Router::new()
        .route("/", get(list_messages))
        .route("/:id/status", put(update_status))
        .with_roles(gates::ADMIN);

    public.merge(admin)
}

/// Store a contact-form submission and notify the admin inbox
async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let message = state
        .services
        .contact
        .submit(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Message submitted successfully",
        json!({ "message": message }),
    ))
}

/// All contact messages, newest first
async fn list_messages(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let messages = state
        .services
        .contact
        .list()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "messages": messages })))
}

/// Triage a message through new → in_progress → resolved
async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContactStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let message = state
        .services
        .contact
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Status updated",
        json!({ "message": message }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactStatusRequest {
    pub status: ContactStatus,
}
