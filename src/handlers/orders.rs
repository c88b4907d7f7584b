use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    errors::ApiError,
    services::{PlaceOrderInput, Requester},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for buyer-facing order endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/track/:order_number", get(track_order))
        .with_auth()
}

/// Create an order from the caller's cart
async fn place_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .place_order(user.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(
        "Order created successfully",
        json!({ "order": order }),
    ))
}

/// The caller's orders, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .orders
        .list_for_user(user.id, query.page, query.limit)
        .await
        .map_err(map_service_error)?;

    let total_pages = if total == 0 {
        0
    } else {
        (total + query.limit - 1) / query.limit
    };

    Ok(success_response(json!({
        "orders": orders,
        "total_pages": total_pages,
        "current_page": query.page,
    })))
}

/// A single order; readable by its owner or an admin
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let requester = Requester {
        user_id: user.id,
        is_admin: user.is_admin(),
    };

    let order = state
        .services
        .orders
        .get(id, &requester)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "order": order })))
}

/// Track an order by its public number
async fn track_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(order_number): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let requester = Requester {
        user_id: user.id,
        is_admin: user.is_admin(),
    };

    let order = state
        .services
        .orders
        .track(&order_number, &requester)
        .await
        .map_err(map_service_error)?;

    let history = state
        .services
        .orders
        .status_history(order.order.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "order": order,
        "status_history": history,
    })))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}
