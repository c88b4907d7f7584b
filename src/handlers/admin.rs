use crate::handlers::common::{
    map_service_error, message_response, success_response, success_with_message, validate_input,
    PaginationParams,
};
use crate::{
    auth::{gates, AuthRouterExt, CurrentUser},
    entities::{OrderStatus, PaymentStatus, Role, SellerStatus},
    errors::{ApiError, ServiceError},
    services::{catalog::ProductFilter, CreateProductInput, Requester, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for the admin management surface
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        // Users
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/role", put(update_user_role))
        .route("/users/:id/toggle", put(toggle_user_active))
        .route("/users/:id", delete(delete_user))
        // Products
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
        // Orders
        .route("/orders", get(list_orders))
        .route("/orders/recent", get(recent_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/orders/:id/payment", put(update_payment_status))
        // Sellers
        .route("/sellers", get(list_sellers))
        .route("/sellers/:id", get(get_seller))
        .route("/sellers/:id/status", put(update_seller_status))
        .route("/sellers/:id/commission", put(update_seller_commission))
        .route("/sellers/:id/toggle", put(toggle_seller_active))
        // Seller requests (pending sellers)
        .route("/seller/requests", get(list_seller_requests))
        .route("/seller/requests/:id/approve", put(approve_seller_request))
        .route("/seller/requests/:id/reject", put(reject_seller_request))
        // Mail transport check
        .route("/test-email", post(send_test_email))
        .with_roles(gates::ADMIN)
}

/// Store-wide summary for the admin landing page
async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let services = &state.services;

    let total_users = services.users.count().await.map_err(map_service_error)?;
    let total_products = services.catalog.count().await.map_err(map_service_error)?;
    let total_orders = services.orders.count().await.map_err(map_service_error)?;
    let total_revenue = services
        .orders
        .paid_revenue()
        .await
        .map_err(map_service_error)?;
    let total_sellers = services.sellers.count().await.map_err(map_service_error)?;
    let pending_seller_requests = services
        .sellers
        .pending_request_count()
        .await
        .map_err(map_service_error)?;
    let recent_orders = services.orders.recent(5).await.map_err(map_service_error)?;

    Ok(success_response(json!({
        "total_users": total_users,
        "total_products": total_products,
        "total_orders": total_orders,
        "total_revenue": total_revenue,
        "total_sellers": total_sellers,
        "pending_seller_requests": pending_seller_requests,
        "recent_orders": recent_orders,
    })))
}

// Users

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (users, total) = state
        .services
        .users
        .list(pagination.page, pagination.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "users": users, "total": total })))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "user": user })))
}

async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .update_role(id, payload.role)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "user": user })))
}

async fn toggle_user_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .toggle_active(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "user": user })))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .users
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("User deleted"))
}

// Products

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let filter = ProductFilter {
        category: None,
        seller_id: None,
        include_inactive: true,
    };
    let (products, total) = state
        .services
        .catalog
        .list_products(filter, pagination.page, pagination.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        json!({ "products": products, "total": total }),
    ))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id, true)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "product": product })))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminCreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload.product)?;

    let product = state
        .services
        .catalog
        .create_product(payload.seller_id, payload.product)
        .await
        .map_err(map_service_error)?;

    Ok(success_with_message(
        "Product created",
        json!({ "product": product }),
    ))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .update_product(id, None, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "product": product })))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id, None)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Product deleted"))
}

// Orders

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .orders
        .list_all(pagination.page, pagination.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "orders": orders, "total": total })))
}

async fn recent_orders(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .recent(5)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "orders": orders })))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let requester = Requester {
        user_id: admin.id,
        is_admin: true,
    };

    let order = state
        .services
        .orders
        .get(id, &requester)
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

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, payload.status, payload.note)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "order": order })))
}

async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_payment_status(id, payload.payment_status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "order": order })))
}

// Sellers

async fn list_sellers(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (sellers, total) = state
        .services
        .sellers
        .list(pagination.page, pagination.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "sellers": sellers, "total": total })))
}

async fn get_seller(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let seller = state
        .services
        .sellers
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "seller": seller })))
}

async fn update_seller_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSellerStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let seller = state
        .services
        .sellers
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "seller": seller })))
}

async fn update_seller_commission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommissionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let seller = state
        .services
        .sellers
        .update_commission(id, payload.commission_rate)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "seller": seller })))
}

async fn toggle_seller_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let seller = state
        .services
        .sellers
        .toggle_active(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "seller": seller })))
}

// Seller requests

async fn list_seller_requests(
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

async fn approve_seller_request(
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

async fn reject_seller_request(
    State(state): State<Arc<AppState>>,
    admin: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectSellerRequest>,
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

/// Exercise the mail transport. Unlike every business notification, a
/// delivery failure here is surfaced to the caller.
async fn send_test_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestEmailRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .mailer
        .send(
            &payload.to,
            "SmartBook test email",
            "<p>The mail transport is configured correctly.</p>",
        )
        .await
        .map_err(|e| map_service_error(ServiceError::ExternalServiceError(e.to_string())))?;

    Ok(message_response("Test email sent"))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RejectSellerRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminCreateProductRequest {
    pub seller_id: Uuid,
    #[serde(flatten)]
    pub product: CreateProductInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSellerStatusRequest {
    pub status: SellerStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommissionRequest {
    pub commission_rate: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TestEmailRequest {
    #[validate(email)]
    pub to: String,
}
