use crate::handlers::common::{map_service_error, success_response, success_with_message};
use crate::{
    auth::{gates, AuthRouterExt, CurrentUser},
    errors::ApiError,
    services::SubmitRequestInput,
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

/// Creates the router for the seller onboarding workflow
pub fn routes() -> Router<Arc<AppState>> {
    let submit = Router::new()
        .route("/request", post(submit_request))
        .with_auth();

    let review = Router::new()
        .route("/requests", get(list_open_requests))
        .route("/requests/:id/approve", put(approve_request))
        .route("/requests/:id/reject", put(reject_request))
        .with_roles(gates::ADMIN);

    submit.merge(review)
}

/// Apply to become a seller
async fn submit_request(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<SubmitRequestInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let request = state
        .services
        .sellers
        .submit_request(user.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Seller request submitted successfully",
        json!({ "request": request }),
    ))
}

/// Open requests awaiting review
async fn list_open_requests(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let requests = state
        .services
        .sellers
        .open_requests()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "requests": requests })))
}

/// Approve a request, creating the seller profile
async fn approve_request(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let request = state
        .services
        .sellers
        .approve_request(id, admin.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Seller request approved successfully",
        json!({ "request": request }),
    ))
}

/// Reject a request with a reason
async fn reject_request(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let request = state
        .services
        .sellers
        .reject_request(id, admin.id, payload.reason)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Seller request rejected successfully",
        json!({ "request": request }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}
