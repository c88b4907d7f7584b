//! OpenAPI document and Swagger UI mount.

use crate::errors::ErrorBody;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SmartBook API",
        description = "Online bookstore backend: catalog, carts, wishlists, checkout, seller onboarding and admin management",
        license(name = "MIT")
    ),
    components(schemas(ErrorBody)),
    tags(
        (name = "auth", description = "Login, registration, password reset"),
        (name = "products", description = "Public catalog"),
        (name = "cart", description = "Cart management and coupons"),
        (name = "wishlist", description = "Wishlist management"),
        (name = "orders", description = "Checkout and order tracking"),
        (name = "seller", description = "Seller self-service"),
        (name = "admin", description = "Administration"),
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
