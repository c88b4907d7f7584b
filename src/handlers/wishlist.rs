use crate::handlers::common::{map_service_error, success_response, success_with_message};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    errors::ApiError,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for wishlist endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_wishlist))
        .route("/", delete(clear_wishlist))
        .route("/items", post(add_item))
        .route("/items/:product_id", delete(remove_item))
        .route("/check/:product_id", get(check_item))
        .route("/count", get(item_count))
        .with_auth()
}

/// Get the caller's wishlist, creating it on first access
async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlist
        .get_view(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "wishlist": wishlist })))
}

/// Add a product to the wishlist
async fn add_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<AddWishlistItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlist
        .add_item(user.id, payload.product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Item added to wishlist successfully",
        json!({ "wishlist": wishlist }),
    ))
}

/// Remove a product from the wishlist
async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlist
        .remove_item(user.id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Item removed from wishlist successfully",
        json!({ "wishlist": wishlist }),
    ))
}

/// Empty the wishlist
async fn clear_wishlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlist
        .clear(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Wishlist cleared successfully",
        json!({ "wishlist": wishlist }),
    ))
}

/// Whether a product is on the wishlist
async fn check_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let is_in_wishlist = state
        .services
        .wishlist
        .contains(user.id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "is_in_wishlist": is_in_wishlist })))
}

/// Number of wishlist entries
async fn item_count(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .wishlist
        .item_count(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "count": count })))
}

#[derive(Debug, Deserialize)]
pub struct AddWishlistItemRequest {
    pub product_id: Uuid,
}
