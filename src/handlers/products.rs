use crate::handlers::common::{map_service_error, success_response, PaginationParams};
use crate::{
    auth::{AuthRouterExt, MaybeUser},
    entities::Category,
    errors::ApiError,
    services::catalog::ProductFilter,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for public catalog endpoints.
///
/// Auth is optional here: anonymous callers browse the active catalog,
/// while an admin bearer token also surfaces inactive products.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .with_optional_auth()
}

/// Browse the catalog, optionally filtered by category
async fn list_products(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let is_admin = caller.map(|u| u.is_admin()).unwrap_or(false);

    let filter = ProductFilter {
        category: query.category,
        seller_id: None,
        include_inactive: is_admin,
    };

    let pagination = PaginationParams {
        page: query.page,
        limit: query.limit,
    };
    let (products, total) = state
        .services
        .catalog
        .list_products(filter, pagination.page, pagination.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "products": products,
        "total": total,
        "total_pages": pagination.total_pages(total),
        "current_page": pagination.page,
    })))
}

/// Catalog detail
async fn get_product(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let is_admin = caller.map(|u| u.is_admin()).unwrap_or(false);

    let product = state
        .services
        .catalog
        .get_product(id, is_admin)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "product": product })))
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub category: Option<Category>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}
