use crate::handlers::common::{
    map_service_error, success_response, success_with_message, validate_input,
};
use crate::{
    auth::{gates, AuthRouterExt, CurrentUser},
    errors::ApiError,
    services::{CreateProductInput, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for seller self-service endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/products", get(list_products))
        .route("/products", post(add_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(remove_product))
        .route("/orders", get(list_orders))
        .with_roles(gates::SELLER)
}

/// Seller dashboard stats
async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stats = state
        .services
        .sellers
        .dashboard(user.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// The seller's own catalog, active and inactive
async fn list_products(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    let products = state
        .services
        .catalog
        .list_for_seller(profile.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "products": products })))
}

/// List a new title
async fn add_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let profile = state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    let product = state
        .services
        .catalog
        .create_product(profile.id, payload)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .sellers
        .record_product_added(profile.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Product added",
        json!({ "product": product }),
    ))
}

/// Edit one of the seller's own products
async fn update_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    let product = state
        .services
        .catalog
        .update_product(id, Some(profile.id), payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Product updated",
        json!({ "product": product }),
    ))
}

/// Delete one of the seller's own products
async fn remove_product(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .catalog
        .delete_product(id, Some(profile.id))
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message("Product deleted", json!({})))
}

/// Orders containing at least one of the seller's lines
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state
        .services
        .sellers
        .get_profile(user.id)
        .await
        .map_err(map_service_error)?;

    let orders = state
        .services
        .orders
        .list_for_seller(profile.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "orders": orders })))
}
