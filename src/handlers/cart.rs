use crate::handlers::common::{
    map_service_error, success_response, success_with_message, validate_input,
};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    errors::ApiError,
    services::AddItemInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", delete(clear_cart))
        .route("/count", get(cart_count))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item))
        .route("/items/:product_id", delete(remove_item))
        .route("/apply-coupon", post(apply_coupon))
        .with_auth()
}

/// Get the caller's cart
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_view(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "cart": cart })))
}

/// Total units across all lines
async fn cart_count(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .cart
        .item_count(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "count": count })))
}

/// Add an item to the cart
async fn add_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<AddItemInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_item(user.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message("Item added", json!({ "cart": cart })))
}

/// Update a line's quantity
async fn update_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .update_item(user.id, product_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Quantity updated",
        json!({ "cart": cart }),
    ))
}

/// Remove a line entirely
async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message("Item removed", json!({ "cart": cart })))
}

/// Apply a coupon code to the cart
async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .apply_coupon(user.id, &payload.code)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Coupon applied",
        json!({ "cart": cart }),
    ))
}

/// Empty the cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .clear(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message("Cart cleared", json!({ "cart": cart })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1, max = 10))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}
